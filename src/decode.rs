//! Result decoding
//!
//! Callers hand the pipeline a parser `FnOnce(&ScVal) -> anyhow::Result<T>`.
//! It runs at most once, on the return value of a successful record, and its
//! error becomes [`SubmissionError::Decode`].

use stellar_xdr::curr::{Limits, ScVal, WriteXdr};

use crate::tx_builder::{SubmissionError, SubmissionResult};

/// Run `parser` over `value`, if there is one
pub fn decode_result<T, F>(value: Option<&ScVal>, parser: F) -> SubmissionResult<Option<T>>
where
    F: FnOnce(&ScVal) -> anyhow::Result<T>,
{
    match value {
        Some(value) => parser(value).map(Some).map_err(SubmissionError::Decode),
        None => Ok(None),
    }
}

/// Adapt a parser of base64 XDR into a parser of [`ScVal`]
pub fn base64_parser<T>(
    parser: impl FnOnce(&str) -> anyhow::Result<T>,
) -> impl FnOnce(&ScVal) -> anyhow::Result<T> {
    move |value: &ScVal| {
        let encoded = value.to_xdr_base64(Limits::none())?;
        parser(&encoded)
    }
}

/// Parser that discards the return value
pub fn ignore_result(_: &ScVal) -> anyhow::Result<()> {
    Ok(())
}
