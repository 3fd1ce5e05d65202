use serde_json::Value;
use tracing::info;

use crate::app::App;
use crate::graphs::{GraphBuilder, GraphError};
use crate::message::Message;
use crate::node::{NodeError, NodePartial, node_fn};
use crate::runtimes::RuntimeConfig;
use crate::state::{FieldKind, State, StateSchema};
use crate::types::NodeKind;

pub const GREETING: &str = "Hello! How can I help you today?";
pub const PROCESS_NOTE: &str = "Let me think about your request.";
pub const JOKE: &str =
    "Why do programmers prefer dark mode? Because light attracts bugs.";
pub const CLARIFICATION: &str = "Could you tell me a bit more about what you need?";

pub fn schema() -> StateSchema {
    StateSchema::new()
        .append("messages")
        .replace("wants_joke", FieldKind::Bool)
}

pub fn initial_state(request: &str) -> State {
    State::new().with("messages", Value::Array(vec![Message::user(request).into()]))
}

fn say(text: &str) -> NodePartial {
    NodePartial::new().with_messages("messages", [Message::assistant(text)])
}

fn process(state: &State) -> Result<NodePartial, NodeError> {
    let request = state
        .messages("messages")
        .into_iter()
        .rev()
        .find(Message::is_user)
        .ok_or(NodeError::MissingInput {
            what: "a user message",
        })?;
    let wants_joke = request.content.to_lowercase().contains("joke");
    Ok(say(PROCESS_NOTE).with("wants_joke", wants_joke))
}

/// `greet -> process -> (tell_joke | ask_clarification) -> END`.
pub fn build_app(config: RuntimeConfig) -> Result<App, GraphError> {
    let app = GraphBuilder::new(schema())
        .add_node(
            "greet",
            node_fn(|_: &State| Ok(say(GREETING))).writes_fields(&["messages"]),
        )?
        .add_node(
            "process",
            node_fn(process).writes_fields(&["messages", "wants_joke"]),
        )?
        .add_node(
            "tell_joke",
            node_fn(|_: &State| Ok(say(JOKE))).writes_fields(&["messages"]),
        )?
        .add_node(
            "ask_clarification",
            node_fn(|_: &State| Ok(say(CLARIFICATION))).writes_fields(&["messages"]),
        )?
        .set_entry_point("greet")?
        .add_edge("greet", "process")?
        .add_conditional_edge(
            "process",
            |s: &State| s.get_bool("wants_joke").unwrap_or(false),
            [
                (true, NodeKind::from("tell_joke")),
                (false, NodeKind::from("ask_clarification")),
            ],
        )?
        .add_edge("tell_joke", NodeKind::End)?
        .add_edge("ask_clarification", NodeKind::End)?
        .with_runtime_config(config)
        .compile()?;
    Ok(app)
}

pub async fn run(request: &str, config: RuntimeConfig) -> miette::Result<State> {
    let app = build_app(config)?;
    let state = app.invoke(initial_state(request)).await?;
    info!(
        messages = state.messages("messages").len(),
        "chat workflow finished"
    );
    Ok(state)
}
