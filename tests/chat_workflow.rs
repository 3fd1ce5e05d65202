//! End-to-end runs of the chat demo: greet, inspect the request, branch on a
//! `bool` label.

use stepgraph::demos::chat::{self, CLARIFICATION, GREETING, JOKE, PROCESS_NOTE};
use stepgraph::message::Message;
use stepgraph::runtimes::{RunnerError, RuntimeConfig};
use stepgraph::types::NodeKind;

#[tokio::test]
async fn joke_request_ends_with_the_joke() {
    let app = chat::build_app(RuntimeConfig::default()).unwrap();
    let state = app.invoke(chat::initial_state("Tell me a joke!")).await.unwrap();

    let messages = state.messages("messages");
    assert_eq!(
        messages,
        vec![
            Message::user("Tell me a joke!"),
            Message::assistant(GREETING),
            Message::assistant(PROCESS_NOTE),
            Message::assistant(JOKE),
        ]
    );
    assert_eq!(state.last_message("messages").unwrap().content, JOKE);
    assert_eq!(state.get_bool("wants_joke"), Some(true));
}

#[tokio::test]
async fn other_requests_ask_for_clarification() {
    let app = chat::build_app(RuntimeConfig::default()).unwrap();
    let state = app
        .invoke(chat::initial_state("What's the weather like?"))
        .await
        .unwrap();

    assert_eq!(state.messages("messages").len(), 4);
    assert_eq!(state.last_message("messages").unwrap().content, CLARIFICATION);
    assert_eq!(state.get_bool("wants_joke"), Some(false));
}

#[tokio::test]
async fn stepwise_run_follows_the_joke_branch() {
    let app = chat::build_app(RuntimeConfig::default()).unwrap();
    let mut run = app.execution(chat::initial_state("another JOKE please")).unwrap();

    let mut path = Vec::new();
    while let Some(report) = run.run_step().await.unwrap() {
        path.push(report.ran.to_string());
    }
    assert_eq!(path, vec!["greet", "process", "tell_joke"]);
    assert_eq!(run.current(), &NodeKind::End);
}

#[tokio::test]
async fn missing_user_message_fails_in_process() {
    let app = chat::build_app(RuntimeConfig::default()).unwrap();
    let err = app.invoke(app.initial_state()).await.unwrap_err();
    assert_eq!(err.node(), Some("process"));
}

#[tokio::test]
async fn run_helper_returns_final_state() {
    let state = chat::run("Tell me a joke!", RuntimeConfig::default()).await.unwrap();
    assert_eq!(state.last_message("messages").unwrap().content, JOKE);
}

#[tokio::test]
async fn caller_config_bounds_the_demo() {
    let app = chat::build_app(RuntimeConfig::default().with_step_limit(2)).unwrap();
    assert_eq!(app.runtime_config().step_limit, 2);
    let err = app
        .invoke(chat::initial_state("Tell me a joke!"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunnerError::StepLimitExceeded { limit: 2, .. }
    ));
}
