//! End-to-end runs of the exchange demo, which routes on run-time string labels.

use serde_json::json;
use stepgraph::demos::exchange::{self, ADVANCE_PAYMENT, SAMPLE_FILE};
use stepgraph::node::NodeError;
use stepgraph::runtimes::{RunnerError, RuntimeConfig};
use stepgraph::types::NodeKind;

#[tokio::test]
async fn advance_payment_file_extracts_shipment_date() {
    let app = exchange::build_app(RuntimeConfig::default()).unwrap();
    let state = app.invoke(exchange::initial_state(SAMPLE_FILE)).await.unwrap();

    assert_eq!(state.get_str("modality"), Some(ADVANCE_PAYMENT));
    assert_eq!(
        state.get("additional_info"),
        Some(&json!({ "expected_shipment_date": "2025-04-15" }))
    );
    let bank = state.get_record("bank_channels_info").unwrap();
    assert_eq!(bank.get("currency"), Some(&json!("USD")));
    assert_eq!(bank.get("amount"), Some(&json!("10000")));
}

#[tokio::test]
async fn advance_payment_lands_on_its_extractor() {
    let app = exchange::build_app(RuntimeConfig::default()).unwrap();
    let mut run = app.execution(exchange::initial_state(SAMPLE_FILE)).unwrap();

    let mut last = None;
    while let Some(report) = run.run_step().await.unwrap() {
        last = Some(report.ran);
    }
    assert_eq!(last, Some(NodeKind::from("extract_advance_payment_info")));
    assert_eq!(run.step(), 4);
}

#[tokio::test]
async fn arrived_imports_extract_declaration() {
    let state = exchange::run(
        "Invoice: the import already arrived at the port.",
        RuntimeConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(
        state.get("additional_info"),
        Some(&json!({ "protocol": "ABC123", "declaration_value": "5000" }))
    );
}

#[tokio::test]
async fn services_extract_service_details() {
    let state = exchange::run(
        "Payment for a maintenance service contract.",
        RuntimeConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(state.get_str("modality"), Some("service"));
    assert_eq!(
        state.get("additional_info"),
        Some(&json!({ "service_details": "Maintenance service contract details" }))
    );
}

#[tokio::test]
async fn unknown_modality_is_unroutable() {
    let app = exchange::build_app(RuntimeConfig::default()).unwrap();
    let err = app
        .invoke(exchange::initial_state("A file with nothing recognisable."))
        .await
        .unwrap_err();
    match err {
        RunnerError::UnroutableBranch {
            node, label, known, step, state,
        } => {
            assert_eq!(node, "determine_modality");
            assert_eq!(label, "unknown");
            assert_eq!(known, vec!["advance_payment", "declaration_import", "services"]);
            assert_eq!(step, 3);
            assert_eq!(state.get_str("modality"), Some(exchange::UNDETERMINED));
            assert_eq!(state.get("additional_info"), Some(&json!(null)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_file_fails_at_first_node() {
    let app = exchange::build_app(RuntimeConfig::default()).unwrap();
    let err = app.invoke(exchange::initial_state("   ")).await.unwrap_err();
    assert_eq!(err.node(), Some("extract_file_content"));
    assert!(matches!(
        err,
        RunnerError::NodeExecution {
            source: NodeError::InvalidInput(_),
            step: 1,
            ..
        }
    ));
}
