//! CLI entry point for relaychat.
//!
//! This binary provides the `relaychat` command with subcommands for the
//! terminal chat UI, the relay server, one-shot questions and the saved
//! conversation.

mod cli;
mod helpers;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use relaychat_core::{
    CANCELLED_MESSAGE, ChatConfig, ChatError, ChatSession, Dispatcher, LlmProvider,
    PendingAttachment, Role, spawn_reveal,
};
use relaychat_relay::{AppState, RelayConfig, RelayServer};
use relaychat_tui::TuiSettings;

use crate::cli::{Cli, Commands, HistoryAction};
use crate::helpers::{
    build_backend, format_timestamp, init_tracing, init_tracing_to_file, open_transcript,
    write_revealed,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Tui { no_persist } => cmd_tui(config_path, no_persist).await,
        Commands::Relay {
            bind,
            port,
            provider,
        } => cmd_relay(config_path, bind, port, provider).await,
        Commands::Ask {
            message,
            attach,
            continue_chat,
            no_reveal,
        } => cmd_ask(config_path, message.join(" "), attach, continue_chat, no_reveal).await,
        Commands::History { action } => cmd_history(config_path, action).await,
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ChatConfig> {
    ChatConfig::load(path.as_deref()).context("failed to load configuration")
}

// ---------------------------------------------------------------------------
// Subcommand: tui
// ---------------------------------------------------------------------------

async fn cmd_tui(config_path: Option<PathBuf>, no_persist: bool) -> Result<()> {
    let config = load_config(config_path)?;
    init_tracing_to_file(&config.store_path.with_extension("log"), "info")?;

    let backend = build_backend(&config)?;
    let transcript = if config.persist && !no_persist {
        Some(open_transcript(&config).await?)
    } else {
        None
    };

    relaychat_tui::run_tui(
        Dispatcher::new(backend),
        TuiSettings::from_config(&config),
        transcript,
    )
    .await
    .context("terminal UI failed")
}

// ---------------------------------------------------------------------------
// Subcommand: relay
// ---------------------------------------------------------------------------

async fn cmd_relay(
    config_path: Option<PathBuf>,
    bind: String,
    port: u16,
    provider: Option<String>,
) -> Result<()> {
    init_tracing("info");

    let config = load_config(config_path)?;
    let upstream = provider
        .as_deref()
        .map(LlmProvider::parse)
        .transpose()
        .context("invalid --provider")?;

    let state = AppState::from_config(&config, upstream).context("failed to configure relay")?;
    let relay_config = RelayConfig {
        bind_addr: bind,
        port,
        max_body_bytes: RelayConfig::body_limit_for(config.max_attachment_bytes),
    };
    let server = RelayServer::new(relay_config, state);

    info!(addr = %server.addr(), "relay listening");
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("relay server failed: {e}"))
}

// ---------------------------------------------------------------------------
// Subcommand: ask
// ---------------------------------------------------------------------------

async fn cmd_ask(
    config_path: Option<PathBuf>,
    message: String,
    attach: Option<PathBuf>,
    continue_chat: bool,
    no_reveal: bool,
) -> Result<()> {
    init_tracing("warn");

    let config = load_config(config_path)?;
    let dispatcher = Dispatcher::new(build_backend(&config)?);

    let transcript = if continue_chat {
        Some(open_transcript(&config).await?)
    } else {
        None
    };
    let mut session = match &transcript {
        Some(store) => ChatSession::with_history(store.load().await?),
        None => ChatSession::new(),
    };

    if let Some(path) = attach {
        let file = PendingAttachment::from_path(&path, config.max_attachment_bytes)
            .with_context(|| format!("cannot attach {}", path.display()))?;
        session.stage_attachment(file);
    }

    let outbound = session.begin_send(&message)?;
    let cancel = outbound.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let outcome = dispatcher.dispatch(&outbound).await;
    interrupt.abort();
    let reply = match session.finish(outbound.id, outcome) {
        Ok(reply) => reply,
        Err(ChatError::Cancelled) => {
            eprintln!("{CANCELLED_MESSAGE}");
            return Ok(());
        }
        Err(e) => bail!(e),
    };

    if let Some(store) = &transcript {
        store
            .save(&session.history().snapshot())
            .await
            .context("failed to save conversation")?;
    }

    if no_reveal {
        println!("{reply}");
        return Ok(());
    }
    print_revealed(reply, config.reveal_interval()).await
}

/// Print `reply` one word at a time.  Ctrl+C stops the reveal and keeps
/// what was already printed.
async fn print_revealed(reply: String, interval: std::time::Duration) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reveal = spawn_reveal(1, reply, interval, tx);

    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    write_revealed(&mut std::io::stdout(), &reveal, &mut rx, interrupted).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: history
// ---------------------------------------------------------------------------

async fn cmd_history(config_path: Option<PathBuf>, action: HistoryAction) -> Result<()> {
    init_tracing("warn");

    let config = load_config(config_path)?;
    let store = open_transcript(&config).await?;

    match action {
        HistoryAction::Show { json } => {
            let turns = store.load().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&turns)?);
                return Ok(());
            }
            if turns.is_empty() {
                println!("No saved conversation.");
                return Ok(());
            }

            if let Some(ts) = store.updated_at().await? {
                println!("Saved {} ({} turns)\n", format_timestamp(ts), turns.len());
            }
            for turn in &turns {
                let who = match turn.role {
                    Role::User => "You",
                    Role::Model => "AI",
                };
                if let Some(file) = turn.attachment() {
                    println!("{who}: [{}; {} bytes]", file.mime_type, file.data.len());
                }
                println!("{who}: {}\n", turn.text());
            }
        }
        HistoryAction::Clear => {
            if store.clear().await? {
                println!("Saved conversation deleted.");
            } else {
                println!("No saved conversation.");
            }
        }
    }

    Ok(())
}
