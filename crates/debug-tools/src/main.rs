use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use api_types::chat::ChatMessage;
use clap::{Parser, Subcommand};
use rpc_types::error::RpcError;
use rpc_types::event::IEventSink;
use rpc_types::WalletFlowPhase;
use runtime::api::{IWalletApi, LiveWalletApi};
use runtime::config::{RuntimeEnvironment, WalletFlowConfig};
use runtime::logging::init_logging;
use serde::Serialize;
use tracing::info;
use wallet_flow::WalletFlow;

#[derive(Parser)]
struct Cli {
    /// Log filter, overrides RUST_LOG.
    #[arg(long, global = true)]
    log_filter: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed a JSON array of chat messages through the wallet flow and print
    /// every state update as a JSON line.
    Replay {
        messages_path: PathBuf,
        #[command(flatten)]
        wallet: WalletArgs,
        /// Feed the conversation one message at a time, like a stream.
        #[arg(long)]
        incremental: bool,
        /// Clear the conversation once all flows finished.
        #[arg(long)]
        clear: bool,
    },
    /// Fetch and print the current buyer and seller balances.
    Snapshot {
        #[command(flatten)]
        wallet: WalletArgs,
    },
}

#[derive(clap::Args)]
struct WalletArgs {
    /// Wallet state endpoint, defaults to WALLET_STATE_URL or the dev
    /// endpoint.
    #[arg(long)]
    wallet_url: Option<String>,
    #[arg(long, default_value = "dev")]
    env: RuntimeEnvironment,
}

impl WalletArgs {
    fn config(self) -> anyhow::Result<WalletFlowConfig> {
        match self.wallet_url {
            Some(url) => WalletFlowConfig::new(self.env, Some(url)),
            None => WalletFlowConfig::from_env(self.env),
        }
    }
}

#[derive(Serialize)]
struct StdoutEvent {
    event: String,
    data: serde_json::Value,
}

/// Prints events as JSON lines.
struct StdoutEventSink;

impl IEventSink for StdoutEventSink {
    fn event(&self, event_type: String, body: String) {
        let event = StdoutEvent {
            event: event_type,
            data: serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)),
        };
        if let Ok(line) = serde_json::to_string(&event) {
            println!("{line}");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_filter.as_deref()) {
        eprintln!("Failed to initialize logging: {err:?}");
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let rpc_error = RpcError::from_anyhow(&err);
            match serde_json::to_string(&rpc_error) {
                Ok(line) => println!("{line}"),
                Err(_) => eprintln!("{err:?}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Replay {
            messages_path,
            wallet,
            incremental,
            clear,
        } => {
            let messages: Vec<ChatMessage> = serde_json::from_slice(
                &fs::read(&messages_path)
                    .with_context(|| format!("reading {}", messages_path.display()))?,
            )
            .context("parsing chat messages")?;
            replay(&messages, wallet.config()?, incremental, clear).await
        }
        Command::Snapshot { wallet } => {
            let api = LiveWalletApi::new(&wallet.config()?);
            let snapshot = api.fetch_wallet_snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

async fn replay(
    messages: &[ChatMessage],
    config: WalletFlowConfig,
    incremental: bool,
    clear: bool,
) -> anyhow::Result<()> {
    let flow = WalletFlow::new(Arc::new(LiveWalletApi::new(&config)), &config);
    let _subscription = flow.forward_to_event_sink(Arc::new(StdoutEventSink));

    // a failed hydration is visible in the printed state, keep going
    let _ = flow.hydrate().await;

    if incremental {
        for end in 1..=messages.len() {
            flow.on_messages(&messages[..end]);
        }
    } else {
        flow.on_messages(messages);
    }
    flow.wait_for_flows().await;

    let state = flow.store().state();
    info!(
        phase = %state.phase,
        progress = %progress_label(state.phase),
        events = state.events.len(),
        "replay finished"
    );

    if clear {
        flow.on_messages(&[]);
    }
    Ok(())
}

/// `step/total` along the successful path, `-` for idle and failed.
fn progress_label(phase: WalletFlowPhase) -> String {
    match phase.progress_step() {
        Some(step) => format!("{}/{}", step + 1, WalletFlowPhase::PROGRESS.len()),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_label() {
        assert_eq!(progress_label(WalletFlowPhase::Initiated), "1/4");
        assert_eq!(progress_label(WalletFlowPhase::Settled), "4/4");
        assert_eq!(progress_label(WalletFlowPhase::Failed), "-");
        assert_eq!(progress_label(WalletFlowPhase::Idle), "-");
    }
}
