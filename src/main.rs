use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

use ayd_relay::logging;
use ayd_relay::transport::{parse_console_line, Console};
use ayd_relay::{
    AydBackend, CsvSessionStore, Dispatcher, GatewayConfig, GatewaySettings, SessionGateway,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging system
    let _log_guard = logging::init_logging()?;

    tracing::info!("=== AYD Relay Starting ===");

    let config = GatewayConfig::from_env()?;

    // Construct every collaborator once and pass it down explicitly
    let store = Arc::new(CsvSessionStore::new(&config.sessions_file));
    let backend = Arc::new(AydBackend::new(&config).context("Failed to create backend client")?);
    let gateway = SessionGateway::new(store, backend, GatewaySettings::from_config(&config));

    let console = Arc::new(Console::new());
    let dispatcher = Dispatcher::new(gateway, console.clone());

    console.print_banner();

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = Vec::new();

    loop {
        console.print_prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match parse_console_line(line) {
            Some(message) => {
                console.print_inbound(&message);
                in_flight.push(dispatcher.dispatch(message));
            }
            None => console.print_error("Expected `identity: question`"),
        }

        in_flight.retain(|handle| !handle.is_finished());
    }

    if !in_flight.is_empty() {
        console.print_system(&format!("Waiting for {} pending replies...", in_flight.len()));
    }
    for handle in in_flight {
        if let Err(e) = handle.await {
            tracing::error!("Reply task failed: {}", e);
        }
    }

    tracing::info!("=== AYD Relay Shutting Down ===");

    Ok(())
}
