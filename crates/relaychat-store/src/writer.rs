//! Ordered background writes to the saved conversation.
//!
//! Front ends queue saves and deletes without awaiting them.  A single task
//! applies them in the order they were queued, so a delete can never be
//! overtaken by a save queued before it.

use relaychat_core::Turn;
use tokio::sync::{mpsc, oneshot};

use crate::transcript::TranscriptStore;

enum WriteOp {
    Save(Vec<Turn>),
    Clear,
    Flush(oneshot::Sender<()>),
}

/// Queue handle for a [`TranscriptStore`].  Cheap to clone; the writer task
/// exits once every handle is dropped and the queue is drained.
#[derive(Clone)]
pub struct TranscriptWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl TranscriptWriter {
    /// Start the writer task.  Must be called inside a tokio runtime.
    pub fn spawn(store: TranscriptStore) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    WriteOp::Save(turns) => {
                        if let Err(e) = store.save(&turns).await {
                            tracing::warn!(error = %e, "failed to save conversation");
                        }
                    }
                    WriteOp::Clear => {
                        if let Err(e) = store.clear().await {
                            tracing::warn!(error = %e, "failed to delete saved conversation");
                        }
                    }
                    WriteOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("transcript writer stopped");
        });

        Self { tx }
    }

    /// Queue an overwrite of the saved conversation.
    pub fn save(&self, turns: Vec<Turn>) {
        self.send(WriteOp::Save(turns));
    }

    /// Queue deletion of the saved conversation.
    pub fn clear(&self) {
        self.send(WriteOp::Clear);
    }

    /// Wait until every write queued so far has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.send(WriteOp::Flush(done));
        let _ = wait.await;
    }

    fn send(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            tracing::warn!("transcript writer is gone; write dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn store() -> TranscriptStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        TranscriptStore::new(db)
    }

    #[tokio::test]
    async fn clear_after_save_wins() {
        let store = store().await;
        let writer = TranscriptWriter::spawn(store.clone());

        writer.save(vec![Turn::user("hello"), Turn::model("hi")]);
        writer.clear();
        writer.flush().await;

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.updated_at().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_after_clear_is_kept() {
        let store = store().await;
        store.save(&[Turn::user("old")]).await.unwrap();
        let writer = TranscriptWriter::spawn(store.clone());

        writer.clear();
        writer.save(vec![Turn::user("new")]);
        writer.flush().await;

        assert_eq!(store.load().await.unwrap(), vec![Turn::user("new")]);
    }

    #[tokio::test]
    async fn saves_apply_in_order() {
        let store = store().await;
        let writer = TranscriptWriter::spawn(store.clone());

        for n in 1..=5 {
            let turns = (0..n).map(|i| Turn::user(format!("turn {i}"))).collect();
            writer.save(turns);
        }
        writer.flush().await;

        assert_eq!(store.load().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn clones_share_one_queue() {
        let store = store().await;
        let writer = TranscriptWriter::spawn(store.clone());
        let other = writer.clone();

        writer.save(vec![Turn::user("a")]);
        other.clear();
        writer.flush().await;

        assert!(store.load().await.unwrap().is_empty());
    }
}
