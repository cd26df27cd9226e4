//! Terminal chat view for relaychat.
//!
//! A three-pane `ratatui` layout (header, conversation, input) over a
//! [`ChatSession`](relaychat_core::ChatSession).  Requests run on spawned
//! tasks and replies are revealed word by word.
//!
//! | key | action |
//! |---|---|
//! | `Enter` | send (or run a `/command`) |
//! | `Ctrl+S` | stop the pending or revealing response |
//! | `Up` / `Down` / `PageUp` / `PageDown` | scroll |
//! | `Esc` / `Ctrl+C` | quit |

pub mod app;
pub mod error;
pub mod run;
pub mod ui;

pub use app::{AppAction, TuiApp, TuiSettings};
pub use error::{Result, TuiError};
pub use run::run_tui;
