//! # relaychat-store
//!
//! Local persistence for relaychat.  The conversation is saved as its
//! structured Turn sequence in a small SQLite key/value table, so a
//! restart restores exactly what was said, attachments included.
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │ TranscriptWriter (ordered queue) │
//! ├──────────────────────────────────┤
//! │ TranscriptStore ("saved-chats")  │
//! ├──────────────────────────────────┤
//! │ Database (rusqlite, WAL)         │
//! │ Migrations (versioned)           │
//! └──────────────────────────────────┘
//! ```
//!
//! ```ignore
//! let db = Database::open_and_migrate("data/relaychat.db").await?;
//! let transcript = TranscriptStore::new(db);
//! let turns = transcript.load().await?;
//! ```

pub mod db;
pub mod error;
pub mod migration;
pub mod transcript;
pub mod writer;

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use transcript::{TRANSCRIPT_KEY, TranscriptStore};
pub use writer::TranscriptWriter;
