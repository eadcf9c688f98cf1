//! End-to-end pipeline tests against the scripted RPC server
//!
//! Covers the simulate → restore → assemble → sign → send → confirm → decode
//! flow of `invoke_soroban_operation` plus the read-only simulation helpers.

#[cfg(test)]
mod pipeline_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use stellar_xdr::curr::{OperationBody, Preconditions, ScVal};

    use crate::config::SubmitterConfig;
    use crate::engine::{InvokeOptions, SubmissionEngine};
    use crate::rpc::{GetTransactionResponse, SendStatus, SimulationOutcome};
    use crate::signer::SignerError;
    use crate::test_utils::*;
    use crate::tx_builder::{
        encode_xdr, unbounded_time_bounds, SubmissionError, TxBuilderOptions, TxParams,
    };

    fn engine(rpc: &Arc<ScriptedRpc>) -> SubmissionEngine {
        SubmissionEngine::new(rpc.clone(), SubmitterConfig::default())
    }

    fn params(signer: &RecordingSigner, sequence: i64) -> TxParams {
        TxParams::new(
            signer.account(sequence),
            Arc::new(signer.clone()),
            TxBuilderOptions::new(100, TEST_PASSPHRASE),
        )
    }

    fn parse_u32(value: &ScVal) -> anyhow::Result<u32> {
        match value {
            ScVal::U32(v) => Ok(*v),
            other => Err(anyhow::anyhow!("expected u32, got {:?}", other)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_assembles_simulated_footprint_and_decodes() {
        let rpc = Arc::new(ScriptedRpc::with_sequence(10));
        let signer = RecordingSigner::new();
        let simulated = success_outcome(Some(ScVal::U32(42)), 500);
        let footprint = match &simulated {
            SimulationOutcome::Success(s) => s.transaction_data.clone(),
            _ => unreachable!(),
        };
        rpc.push_simulation(simulated).await;
        rpc.push_transaction(GetTransactionResponse::success(Some(ScVal::U32(42)), 77))
            .await;

        let result = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                parse_u32,
                &params(&signer, 0),
                InvokeOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.value, Some(42));
        assert_eq!(result.ledger, Some(77));
        assert!(!result.restored);
        assert_eq!(result.account.sequence(), 11);

        let sent = rpc.sent_envelopes().await;
        assert_eq!(sent.len(), 1);
        let tx = tx_of(&sent[0]);
        assert_eq!(tx.seq_num.0, 11);
        assert_eq!(tx.fee, 600);
        assert_eq!(soroban_data_of(&tx), Some(&footprint));
        assert_eq!(signer.sign_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_error_never_signs_or_sends() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        rpc.push_simulation(error_outcome(
            "HostError: Error(Contract, #4)",
            vec!["AAAAAQ==".to_string(), "AAAAAg==".to_string()],
        ))
        .await;

        let err = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                parse_u32,
                &params(&signer, 0),
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();

        match &err {
            SubmissionError::Simulation {
                message,
                diagnostic_events,
                envelope_xdr,
            } => {
                assert!(message.contains("Contract, #4"));
                assert_eq!(diagnostic_events.len(), 2);
                assert!(!envelope_xdr.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(signer.sign_count().await, 0);
        assert_eq!(rpc.send_count().await, 0);
        assert_eq!(rpc.poll_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restoration_consumes_one_sequence_then_resimulates() {
        let rpc = Arc::new(ScriptedRpc::with_sequence(10));
        let signer = RecordingSigner::new();
        let restore = restore_outcome(1000);
        let preamble_data = match &restore {
            SimulationOutcome::RestoreRequired { preamble, .. } => {
                preamble.transaction_data.clone()
            }
            _ => unreachable!(),
        };
        rpc.push_simulation(restore).await;
        rpc.push_simulation(success_outcome(Some(ScVal::U32(7)), 500))
            .await;
        rpc.push_transaction(GetTransactionResponse::success(None, 50))
            .await;
        rpc.push_transaction(GetTransactionResponse::success(Some(ScVal::U32(7)), 51))
            .await;

        let result = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                parse_u32,
                &params(&signer, 10),
                InvokeOptions::default(),
            )
            .await
            .unwrap();

        // first simulation from S=10, re-simulation from S+1 after the restore
        assert_eq!(rpc.simulated_sequences().await, vec![11, 12]);

        let sent = rpc.sent_envelopes().await;
        assert_eq!(sent.len(), 2);

        let restore_tx = tx_of(&sent[0]);
        assert_eq!(restore_tx.fee, 2000);
        assert_eq!(restore_tx.seq_num.0, 11);
        assert_eq!(restore_tx.cond, Preconditions::Time(unbounded_time_bounds()));
        assert_eq!(soroban_data_of(&restore_tx), Some(&preamble_data));
        assert_eq!(restore_tx.operations.len(), 1);
        assert!(matches!(
            restore_tx.operations[0].body,
            OperationBody::RestoreFootprint(_)
        ));

        let main_tx = tx_of(&sent[1]);
        assert_eq!(main_tx.seq_num.0, 12);
        assert_eq!(main_tx.fee, 600);

        assert!(result.restored);
        assert_eq!(result.value, Some(7));
        assert_eq!(result.account.sequence(), 12);
        assert_eq!(rpc.account_sequence().await, Some(12));
        assert_eq!(signer.sign_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_restore_request_is_invalid() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        rpc.push_simulation(restore_outcome(10)).await;
        rpc.push_simulation(restore_outcome(10)).await;

        let err = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                parse_u32,
                &params(&signer, 0),
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.category(), "invalid_simulation");
        assert_eq!(rpc.send_count().await, 1);
        assert_eq!(signer.sign_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restoration_failure_aborts_submission() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        rpc.push_simulation(restore_outcome(10)).await;
        rpc.push_send(send_response(SendStatus::Error)).await;

        let err = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                parse_u32,
                &params(&signer, 0),
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            SubmissionError::Restoration(inner) => {
                assert_eq!(inner.category(), "send");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(rpc.simulated_sequences().await.len(), 1);
        assert_eq!(rpc.send_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restoration_signing_failure_is_restoration_error() {
        let rpc = Arc::new(ScriptedRpc::new());
        rpc.push_simulation(restore_outcome(10)).await;

        let params = TxParams::new(
            RecordingSigner::new().account(0),
            Arc::new(FailingSigner),
            TxBuilderOptions::new(100, TEST_PASSPHRASE),
        );
        let err = engine(&rpc)
            .invoke_soroban_operation(&upload_wasm_op(), parse_u32, &params, InvokeOptions::default())
            .await
            .unwrap_err();

        match err {
            SubmissionError::Restoration(inner) => {
                assert!(matches!(*inner, SubmissionError::Signing(SignerError::Rejected(_))));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(rpc.send_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extra_footprint_appended_to_read_write() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        rpc.push_simulation(success_outcome(None, 100)).await;

        let options = InvokeOptions::default()
            .with_extra_footprint(vec![contract_code_key(2), contract_code_key(3)]);
        let result = engine(&rpc)
            .invoke_soroban_operation(&upload_wasm_op(), parse_u32, &params(&signer, 0), options)
            .await
            .unwrap();
        assert_eq!(result.value, None);

        let tx = tx_of(&rpc.sent_envelopes().await[0]);
        let data = soroban_data_of(&tx).unwrap();
        assert_eq!(
            data.resources.footprint.read_write.to_vec(),
            vec![contract_code_key(2), contract_code_key(2), contract_code_key(3)]
        );
        assert_eq!(
            data.resources.footprint.read_only.to_vec(),
            vec![contract_code_key(1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_signing_failure_is_fatal_and_not_retried() {
        let rpc = Arc::new(ScriptedRpc::new());
        rpc.push_simulation(success_outcome(None, 100)).await;

        let params = TxParams::new(
            RecordingSigner::new().account(0),
            Arc::new(FailingSigner),
            TxBuilderOptions::new(100, TEST_PASSPHRASE),
        );
        let err = engine(&rpc)
            .invoke_soroban_operation(&upload_wasm_op(), parse_u32, &params, InvokeOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.category(), "signing");
        assert_eq!(rpc.send_count().await, 0);
        assert_eq!(rpc.simulated_sequences().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parser_failure_is_decode_error() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        rpc.push_simulation(success_outcome(Some(ScVal::Void), 100))
            .await;
        rpc.push_transaction(GetTransactionResponse::success(Some(ScVal::Void), 3))
            .await;

        let err = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                parse_u32,
                &params(&signer, 0),
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.category(), "decode");
        assert_eq!(rpc.send_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_failure_after_not_found_polls() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        rpc.push_simulation(success_outcome(Some(ScVal::U32(1)), 100))
            .await;
        rpc.push_not_found(5).await;
        rpc.push_transaction(GetTransactionResponse::failed(
            Some("AAAAAAAAAGT////7AAAAAA==".to_string()),
            vec!["AAAAAQ==".to_string()],
        ))
        .await;

        let parsed = AtomicUsize::new(0);
        let err = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                |value: &ScVal| {
                    parsed.fetch_add(1, Ordering::SeqCst);
                    parse_u32(value)
                },
                &params(&signer, 0),
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();

        match &err {
            SubmissionError::Confirmation {
                result_xdr,
                diagnostic_events,
                envelope_xdr,
                ..
            } => {
                assert!(result_xdr.is_some());
                assert_eq!(diagnostic_events, &vec!["AAAAAQ==".to_string()]);
                let sent = rpc.sent_envelopes().await;
                assert_eq!(envelope_xdr, &encode_xdr(&sent[0]).unwrap());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(rpc.poll_count().await, 6);
        assert_eq!(parsed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_account_fails_before_simulation() {
        let rpc = Arc::new(ScriptedRpc::new());
        rpc.remove_account().await;
        let signer = RecordingSigner::new();

        let err = engine(&rpc)
            .invoke_soroban_operation(
                &upload_wasm_op(),
                parse_u32,
                &params(&signer, 0),
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.category(), "rpc");
        assert!(rpc.simulated_sequences().await.is_empty());
        let calls = rpc.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call, RpcCall::GetAccount);
    }

    #[tokio::test]
    async fn test_resimulation_is_idempotent() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        rpc.push_simulation(success_outcome(Some(ScVal::U32(1)), 100))
            .await;
        rpc.push_simulation(success_outcome(Some(ScVal::U32(1)), 100))
            .await;

        let engine = engine(&rpc);
        let params = params(&signer, 4);
        let first = engine
            .simulate_operation(&upload_wasm_op(), &params)
            .await
            .unwrap();
        let second = engine
            .simulate_operation(&upload_wasm_op(), &params)
            .await
            .unwrap();

        assert_eq!(first.kind(), second.kind());
        assert_eq!(rpc.simulated_sequences().await, vec![5, 5]);
        assert_eq!(params.account.sequence(), 4);
        assert_eq!(rpc.send_count().await, 0);
    }

    #[tokio::test]
    async fn test_simulated_result_reads_through_restore() {
        let rpc = Arc::new(ScriptedRpc::new());
        let signer = RecordingSigner::new();
        let mut restore = restore_outcome(10);
        if let SimulationOutcome::RestoreRequired { return_value, .. } = &mut restore {
            *return_value = Some(ScVal::U32(99));
        }
        rpc.push_simulation(restore).await;
        rpc.push_simulation(success_outcome(None, 100)).await;
        rpc.push_simulation(error_outcome("trap", Vec::new())).await;

        let engine = engine(&rpc);
        let params = params(&signer, 0);

        let value = engine
            .simulate_operation_result(&upload_wasm_op(), parse_u32, &params)
            .await
            .unwrap();
        assert_eq!(value, 99);

        let err = engine
            .simulate_operation_result(&upload_wasm_op(), parse_u32, &params)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "invalid_simulation");

        let err = engine
            .simulate_operation_result(&upload_wasm_op(), parse_u32, &params)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "simulation");

        assert_eq!(rpc.send_count().await, 0);
        assert_eq!(signer.sign_count().await, 0);
    }
}
