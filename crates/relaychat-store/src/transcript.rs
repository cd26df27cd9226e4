//! Saved conversation.
//!
//! The whole Turn sequence is stored as one JSON document under a single key
//! in `local_state`, overwritten after each completed exchange.

use relaychat_core::Turn;
use rusqlite::OptionalExtension;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;

/// Key the conversation is saved under.
pub const TRANSCRIPT_KEY: &str = "saved-chats";

/// Reads and writes the saved conversation.
#[derive(Clone)]
pub struct TranscriptStore {
    db: Database,
    key: String,
}

impl TranscriptStore {
    pub fn new(db: Database) -> Self {
        Self::with_key(db, TRANSCRIPT_KEY)
    }

    /// Store under a different key (several profiles in one file).
    pub fn with_key(db: Database, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }

    /// Replace the saved conversation with `turns`.
    #[instrument(skip(self, turns), fields(key = %self.key))]
    pub async fn save(&self, turns: &[Turn]) -> StoreResult<()> {
        let json = serde_json::to_string(turns)?;
        let key = self.key.clone();
        let count = turns.len();

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO local_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                    updated_at = excluded.updated_at",
                    rusqlite::params![key, json, chrono::Utc::now().timestamp()],
                )?;
                Ok(())
            })
            .await?;

        debug!(turns = count, "conversation saved");
        Ok(())
    }

    /// The saved conversation, or an empty one if nothing was saved.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn load(&self) -> StoreResult<Vec<Turn>> {
        let key = self.key.clone();
        let raw: Option<String> = self
            .db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT value FROM local_state WHERE key = ?1",
                        [&key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// When the conversation was last saved (unix seconds).
    pub async fn updated_at(&self) -> StoreResult<Option<i64>> {
        let key = self.key.clone();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT updated_at FROM local_state WHERE key = ?1",
                        [&key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await
    }

    /// Delete the saved conversation.  Returns whether anything was removed.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn clear(&self) -> StoreResult<bool> {
        let key = self.key.clone();
        let removed = self
            .db
            .execute(move |conn| {
                Ok(conn.execute("DELETE FROM local_state WHERE key = ?1", [&key])?)
            })
            .await?;
        debug!(removed, "conversation cleared");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaychat_core::InlineData;

    async fn store() -> TranscriptStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        TranscriptStore::new(db)
    }

    #[tokio::test]
    async fn empty_store_loads_nothing() {
        let store = store().await;
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.updated_at().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let store = store().await;
        store.save(&[Turn::user("hi")]).await.unwrap();
        store
            .save(&[Turn::user("hi"), Turn::model("hello")])
            .await
            .unwrap();

        let turns = store.load().await.unwrap();
        assert_eq!(turns, vec![Turn::user("hi"), Turn::model("hello")]);
        assert!(store.updated_at().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn attachments_survive_a_round_trip() {
        let store = store().await;
        let turn = Turn::user_with_attachment(
            "look",
            Some(InlineData {
                mime_type: "image/png".into(),
                data: vec![0x89, b'P', b'N', b'G'],
            }),
        );
        store.save(std::slice::from_ref(&turn)).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded[0].attachment(), turn.attachment());
    }

    #[tokio::test]
    async fn clear_removes_only_this_key() {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let main = TranscriptStore::new(db.clone());
        let other = TranscriptStore::with_key(db, "scratch");

        main.save(&[Turn::user("a")]).await.unwrap();
        other.save(&[Turn::user("b")]).await.unwrap();

        assert!(main.clear().await.unwrap());
        assert!(!main.clear().await.unwrap());
        assert!(main.load().await.unwrap().is_empty());
        assert_eq!(other.load().await.unwrap(), vec![Turn::user("b")]);
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let store = store().await;
        store
            .db
            .execute(|conn| {
                conn.execute(
                    "INSERT INTO local_state (key, value, updated_at) VALUES ('saved-chats', 'not json', 0)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        assert!(matches!(
            store.load().await,
            Err(crate::error::StoreError::Json(_))
        ));
    }
}
