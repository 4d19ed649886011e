use std::env;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use fraud_assistant::agent::FraudAgent;
use fraud_assistant::core::config::{AppPaths, ConfigService};
use fraud_assistant::core::logging;
use fraud_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config = ConfigService::new(paths.clone())
        .load()
        .context("Failed to load configuration")?;
    let state = AppState::initialize(paths, config).await?;
    let mut agent = state.new_agent();

    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        let reply = agent.run_turn(&args.join(" ")).await?;
        println!("{}", reply);
        return Ok(());
    }

    interactive(&mut agent).await
}

/// One stdin line per turn until `exit` or EOF. A failed turn is reported and
/// the session continues.
async fn interactive(agent: &mut FraudAgent) -> anyhow::Result<()> {
    tracing::info!("Interactive session {} started", agent.session_id());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match agent.run_turn(input).await {
            Ok(reply) => {
                stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
            }
            Err(err) => tracing::error!("Turn failed: {}", err),
        }
    }

    tracing::info!(
        "Session {} ended after {} turns",
        agent.session_id(),
        agent.memory().total_turns()
    );
    Ok(())
}
