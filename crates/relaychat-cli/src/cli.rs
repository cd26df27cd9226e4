//! CLI argument definitions for relaychat.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// relaychat -- a terminal chat client and key-holding relay.
#[derive(Parser)]
#[command(
    name = "relaychat",
    version,
    about = "relaychat -- chat with OpenAI or Gemini through a key-holding relay",
    long_about = "A terminal chat client that reveals replies word by word, plus the small \
                  HTTP relay that keeps provider keys on the server."
)]
pub struct Cli {
    /// Config file (defaults to ./relaychat.toml when present).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the terminal chat UI.
    Tui {
        /// Do not restore or save the conversation.
        #[arg(long)]
        no_persist: bool,
    },

    /// Start the relay server.
    Relay {
        /// Address to bind the HTTP server to.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on.
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Upstream provider (`openai` or `gemini`).
        #[arg(long)]
        provider: Option<String>,
    },

    /// Send one message and print the reply.
    Ask {
        /// The message to send.
        #[arg(required_unless_present = "attach")]
        message: Vec<String>,

        /// File to attach to the message.
        #[arg(long, short)]
        attach: Option<PathBuf>,

        /// Continue the saved conversation and save the exchange.
        #[arg(long = "continue")]
        continue_chat: bool,

        /// Print the reply at once instead of word by word.
        #[arg(long)]
        no_reveal: bool,
    },

    /// Inspect or delete the saved conversation.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Print the saved conversation.
    Show {
        /// Print the raw turns as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete the saved conversation.
    Clear,
}
