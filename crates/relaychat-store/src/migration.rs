//! Versioned schema migrations.
//!
//! Applied versions are recorded in `_migrations`; each pending migration
//! runs in its own transaction together with its bookkeeping row.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Ordered by version; never edit an entry once released.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "local_state key/value table",
    sql: r#"
        CREATE TABLE local_state (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  INTEGER NOT NULL
        );
    "#,
}];

/// Latest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Apply every migration newer than the recorded version.
///
/// Synchronous; call through [`Database::execute`](crate::Database::execute).
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to create _migrations table: {e}"),
    })?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        debug!(current_version = current, "schema is up to date");
        return Ok(());
    }

    for migration in pending {
        apply(conn, migration)?;
    }
    info!(version = latest_version(), "migrations applied");
    Ok(())
}

/// Latest applied version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to read current version: {e}"),
    })
}

fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(
        version = migration.version,
        description = migration.description,
        "applying migration"
    );
    let fail = |message: String| StoreError::Migration {
        version: migration.version,
        message,
    };

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| fail(format!("failed to begin transaction: {e}")))?;

    let result = tx
        .execute_batch(migration.sql)
        .map_err(|e| fail(format!("SQL execution failed: {e}")))
        .and_then(|()| {
            tx.execute(
                "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    migration.version,
                    migration.description,
                    chrono::Utc::now().timestamp()
                ],
            )
            .map_err(|e| fail(format!("failed to record migration: {e}")))
        });

    match result {
        Ok(_) => tx
            .commit()
            .map_err(|e| fail(format!("failed to commit: {e}"))),
        Err(err) => {
            // Dropping `tx` rolls back.
            warn!(version = migration.version, %err, "migration failed, rolling back");
            Err(err)
        }
    }
}
