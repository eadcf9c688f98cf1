//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Submission pipeline metrics
pub struct Metrics {
    registry: Registry,

    // Counters
    pub submissions_total: IntCounter,
    pub submissions_success: IntCounter,
    pub submissions_failed: IntCounter,
    pub simulation_errors: IntCounter,
    pub restorations_total: IntCounter,
    pub send_retries_total: IntCounter,
    pub confirmation_polls_total: IntCounter,

    // Histograms
    pub submit_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "submissions_total",
            "Total number of submissions started",
        ))?;

        let submissions_success = IntCounter::with_opts(Opts::new(
            "submissions_success",
            "Number of submissions confirmed successful",
        ))?;

        let submissions_failed = IntCounter::with_opts(Opts::new(
            "submissions_failed",
            "Number of submissions that ended in an error",
        ))?;

        let simulation_errors = IntCounter::with_opts(Opts::new(
            "simulation_errors",
            "Number of simulations reported as failed by the RPC server",
        ))?;

        let restorations_total = IntCounter::with_opts(Opts::new(
            "restorations_total",
            "Number of footprint restorations submitted",
        ))?;

        let send_retries_total = IntCounter::with_opts(Opts::new(
            "send_retries_total",
            "Number of resends after TRY_AGAIN_LATER",
        ))?;

        let confirmation_polls_total = IntCounter::with_opts(Opts::new(
            "confirmation_polls_total",
            "Number of getTransaction polls",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new(
                "submit_latency_seconds",
                "Time from first send to terminal record",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_success.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(simulation_errors.clone()))?;
        registry.register(Box::new(restorations_total.clone()))?;
        registry.register(Box::new(send_retries_total.clone()))?;
        registry.register(Box::new(confirmation_polls_total.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submissions_success,
            submissions_failed,
            simulation_errors,
            restorations_total,
            send_retries_total,
            confirmation_polls_total,
            submit_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
///
/// Panics on first use if the collectors fail to register, which only a
/// duplicate or malformed metric name can cause.
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let m = metrics();
        let before = m.restorations_total.get();
        m.restorations_total.inc();
        assert!(m.restorations_total.get() >= before + 1);
    }

    #[test]
    fn test_registration_never_collides_across_instances() {
        // each instance owns its registry, so the global can always register
        for _ in 0..3 {
            assert!(Metrics::new().is_ok());
        }
        assert!(metrics().render().is_ok());
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        let m = Metrics::new().unwrap();
        m.submissions_total.inc();
        m.submit_latency.observe(1.5);

        let text = m.render().unwrap();
        assert!(text.contains("submissions_total 1"));
        assert!(text.contains("submit_latency_seconds_count 1"));
    }
}
