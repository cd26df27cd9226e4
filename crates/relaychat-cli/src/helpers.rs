//! Shared helpers for the subcommands.

use std::fs::OpenOptions;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use relaychat_core::{
    CANCELLED_MESSAGE, ChatBackend, ChatConfig, LlmClient, RevealEvent, RevealHandle,
};
use relaychat_store::{Database, TranscriptStore};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialise the tracing subscriber on stderr.
///
/// Respects `RUST_LOG` if set; otherwise uses `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Initialise tracing into a log file, for the full-screen UI.
pub fn init_tracing_to_file(path: &Path, default_level: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Build the backend the client talks to.
pub fn build_backend(config: &ChatConfig) -> Result<Arc<dyn ChatBackend>> {
    let client_config = config
        .client_config()
        .context("provider is not configured")?;
    let client = LlmClient::new(client_config).context("failed to create the chat client")?;
    Ok(Arc::new(client))
}

/// Open the saved-conversation store.
pub async fn open_transcript(config: &ChatConfig) -> Result<TranscriptStore> {
    let db = Database::open_and_migrate(config.store_path.clone())
        .await
        .with_context(|| format!("failed to open {}", config.store_path.display()))?;
    Ok(TranscriptStore::new(db))
}

// ---------------------------------------------------------------------------
// Reveal output
// ---------------------------------------------------------------------------

/// Write reveal frames to `out` as they arrive.
///
/// When `stop` resolves first the reveal is cancelled: the words shown so far
/// stay and the stop notice follows on its own line.  Returns whether the
/// reveal was stopped.
pub async fn write_revealed<W: Write>(
    out: &mut W,
    reveal: &RevealHandle,
    events: &mut mpsc::UnboundedReceiver<RevealEvent>,
    stop: impl Future<Output = ()>,
) -> Result<bool> {
    tokio::pin!(stop);
    let mut printed = 0;
    let mut stop_requested = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(RevealEvent::Frame { visible, .. }) => {
                    write!(out, "{}", &visible[printed..])?;
                    out.flush()?;
                    printed = visible.len();
                }
                Some(RevealEvent::Cancelled { visible, .. }) => {
                    write!(out, "{}", &visible[printed..])?;
                    writeln!(out)?;
                    writeln!(out, "{CANCELLED_MESSAGE}")?;
                    out.flush()?;
                    return Ok(true);
                }
                Some(RevealEvent::Done { .. }) | None => break,
            },
            () = &mut stop, if !stop_requested => {
                stop_requested = true;
                reveal.cancel();
            }
        }
    }

    writeln!(out)?;
    out.flush()?;
    Ok(false)
}

/// Render a unix timestamp for humans.
pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
