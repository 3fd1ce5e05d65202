use miette::{IntoDiagnostic, Result};
use stepgraph::demos::{chat, exchange};
use stepgraph::runtimes::RuntimeConfig;
use stepgraph::state::State;
use stepgraph::telemetry::init_tracing;

fn print_state(title: &str, state: &State) -> Result<()> {
    let rendered = serde_json::to_string_pretty(state).into_diagnostic()?;
    println!("== {title} ==\n{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    miette::set_panic_hook();
    let config = RuntimeConfig::from_env();

    // cargo run -- [chat | exchange | both] [input text]
    let mut args = std::env::args().skip(1);
    let which = args.next().unwrap_or_else(|| "both".to_string());
    let input = args.next();

    match which.as_str() {
        "chat" => {
            let request = input.as_deref().unwrap_or("Tell me a joke!");
            print_state("chat", &chat::run(request, config).await?)?;
        }
        "exchange" => {
            let text = input.as_deref().unwrap_or(exchange::SAMPLE_FILE);
            print_state("exchange", &exchange::run(text, config).await?)?;
        }
        "both" => {
            print_state("chat", &chat::run("Tell me a joke!", config.clone()).await?)?;
            print_state(
                "exchange",
                &exchange::run(exchange::SAMPLE_FILE, config).await?,
            )?;
        }
        other => {
            miette::bail!("unknown workflow `{other}`; expected one of: chat, exchange, both")
        }
    }
    Ok(())
}
