//! Foreign-exchange remittance intake.
//!
//! `extract_file_content -> extract_bank_channels -> determine_modality`, then
//! one of three modality-specific extractors chosen by a run-time label. The
//! extraction steps return canned results in place of model calls.

use serde_json::{Value, json};
use tracing::info;

use crate::app::App;
use crate::graphs::{GraphBuilder, GraphError};
use crate::node::{NodeError, NodePartial, node_fn};
use crate::runtimes::RuntimeConfig;
use crate::state::{FieldKind, State, StateSchema};
use crate::types::NodeKind;

pub const ADVANCE_PAYMENT: &str = "advance payment";
pub const IMPORT_ARRIVED: &str = "import already arrived";
pub const SERVICE: &str = "service";
pub const UNDETERMINED: &str = "undetermined";

pub const SAMPLE_FILE: &str = "Customer File Content:\n\
    The customer has provided a remittance file. The transaction was processed via Online \
    Banking and Wire Transfer. The amount of USD 10,000 was remitted to Beneficiary A and \
    Beneficiary B. The operation is an import with advance payment; the expected shipment \
    date is 2025-04-15.";

pub fn schema() -> StateSchema {
    StateSchema::new()
        .replace("file_text", FieldKind::String)
        .replace("bank_channels_info", FieldKind::Record)
        .replace("modality", FieldKind::String)
        .replace("additional_info", FieldKind::Record)
}

pub fn initial_state(file_text: &str) -> State {
    State::new().with("file_text", file_text)
}

fn file_text(state: &State) -> Result<&str, NodeError> {
    let text = state
        .get_str("file_text")
        .ok_or(NodeError::MissingInput { what: "file_text" })?;
    if text.trim().is_empty() {
        return Err(NodeError::InvalidInput("file_text is blank".to_string()));
    }
    Ok(text)
}

fn extract_file_content(state: &State) -> Result<NodePartial, NodeError> {
    file_text(state)?;
    Ok(NodePartial::new())
}

fn extract_bank_channels(state: &State) -> Result<NodePartial, NodeError> {
    file_text(state)?;
    Ok(NodePartial::new().with(
        "bank_channels_info",
        json!({
            "channels": "Online Banking, Wire Transfer",
            "amount": "10000",
            "currency": "USD",
            "beneficiaries": ["Beneficiary A", "Beneficiary B"],
        }),
    ))
}

/// Classifies the operation from keywords in the file text.
pub fn detect_modality(text: &str) -> &'static str {
    let text = text.to_lowercase();
    if text.contains(ADVANCE_PAYMENT) {
        ADVANCE_PAYMENT
    } else if text.contains("already arrived") {
        IMPORT_ARRIVED
    } else if text.contains(SERVICE) {
        SERVICE
    } else {
        UNDETERMINED
    }
}

fn determine_modality(state: &State) -> Result<NodePartial, NodeError> {
    let modality = detect_modality(file_text(state)?);
    Ok(NodePartial::new().with("modality", modality))
}

/// Branch label for the recorded modality; `"unknown"` has no route.
pub fn modality_label(state: &State) -> String {
    let modality = state.get_str("modality").unwrap_or_default().to_lowercase();
    let label = if modality.contains(ADVANCE_PAYMENT) {
        "advance_payment"
    } else if modality.contains(IMPORT_ARRIVED) {
        "declaration_import"
    } else if modality.contains(SERVICE) {
        "services"
    } else {
        "unknown"
    };
    label.to_string()
}

fn additional_info(
    info: Value,
) -> impl Fn(&State) -> Result<NodePartial, NodeError> + Send + Sync + 'static {
    move |state: &State| {
        file_text(state)?;
        Ok(NodePartial::new().with("additional_info", info.clone()))
    }
}

pub fn build_app(config: RuntimeConfig) -> Result<App, GraphError> {
    let app = GraphBuilder::new(schema())
        .add_node("extract_file_content", node_fn(extract_file_content))?
        .add_node(
            "extract_bank_channels",
            node_fn(extract_bank_channels).writes_fields(&["bank_channels_info"]),
        )?
        .add_node(
            "determine_modality",
            node_fn(determine_modality).writes_fields(&["modality"]),
        )?
        .add_node(
            "extract_advance_payment_info",
            node_fn(additional_info(json!({ "expected_shipment_date": "2025-04-15" })))
                .writes_fields(&["additional_info"]),
        )?
        .add_node(
            "extract_declaration_import_info",
            node_fn(additional_info(
                json!({ "protocol": "ABC123", "declaration_value": "5000" }),
            ))
            .writes_fields(&["additional_info"]),
        )?
        .add_node(
            "extract_services_info",
            node_fn(additional_info(
                json!({ "service_details": "Maintenance service contract details" }),
            ))
            .writes_fields(&["additional_info"]),
        )?
        .set_entry_point("extract_file_content")?
        .add_edge("extract_file_content", "extract_bank_channels")?
        .add_edge("extract_bank_channels", "determine_modality")?
        .add_dynamic_conditional_edge(
            "determine_modality",
            modality_label,
            [
                ("advance_payment", NodeKind::from("extract_advance_payment_info")),
                ("declaration_import", NodeKind::from("extract_declaration_import_info")),
                ("services", NodeKind::from("extract_services_info")),
            ],
        )?
        .add_edge("extract_advance_payment_info", NodeKind::End)?
        .add_edge("extract_declaration_import_info", NodeKind::End)?
        .add_edge("extract_services_info", NodeKind::End)?
        .with_runtime_config(config)
        .compile()?;
    Ok(app)
}

pub async fn run(file_text: &str, config: RuntimeConfig) -> miette::Result<State> {
    let app = build_app(config)?;
    let state = app.invoke(initial_state(file_text)).await?;
    info!(
        modality = state.get_str("modality").unwrap_or_default(),
        "exchange workflow finished"
    );
    Ok(state)
}
