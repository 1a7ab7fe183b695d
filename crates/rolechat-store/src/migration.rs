//! Versioned schema migrations.
//!
//! Each migration is a static SQL batch.  Applied versions are recorded in
//! `_migrations`, so running the set again only applies what is new.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Append new migrations to the end; versions must increase.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "conversations and messages",
    sql: r#"
        CREATE TABLE conversations (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL,
            title        TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL,
            last_message TEXT
        );
        CREATE INDEX idx_conversations_user ON conversations(user_id, updated_at);

        -- Messages may reference a conversation that was never created.
        CREATE TABLE messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            role            TEXT NOT NULL CHECK(role IN ('user','assistant')),
            content         TEXT NOT NULL,
            timestamp       TEXT NOT NULL
        );
        CREATE INDEX idx_messages_conversation ON messages(conversation_id, timestamp);
    "#,
}];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Apply every migration newer than the recorded version.
///
/// Synchronous; call from the blocking pool.
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "schema up to date");
        return Ok(());
    }

    info!(current_version = current, pending = pending.len(), "migrating schema");
    for migration in pending {
        apply(conn, migration)?;
    }
    Ok(())
}

/// Highest applied version, or 0 on a fresh database.
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

/// Latest version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
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
    })
}

/// Run one migration and its bookkeeping row in a single transaction.
fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    let version = migration.version;
    let fail = |stage: &str, e: rusqlite::Error| StoreError::Migration {
        version,
        message: format!("{stage}: {e}"),
    };

    conn.execute_batch("BEGIN IMMEDIATE;")
        .map_err(|e| fail("begin", e))?;

    let result = conn
        .execute_batch(migration.sql)
        .map_err(|e| fail("execute", e))
        .and_then(|()| {
            conn.execute(
                "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![version, migration.description, chrono::Utc::now().timestamp()],
            )
            .map_err(|e| fail("record", e))
        });

    match result {
        Ok(_) => {
            conn.execute_batch("COMMIT;")
                .map_err(|e| fail("commit", e))?;
            info!(version, description = migration.description, "migration applied");
            Ok(())
        }
        Err(err) => {
            warn!(version, %err, "migration failed, rolling back");
            let _ = conn.execute_batch("ROLLBACK;");
            Err(err)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_strictly_increase() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[1].version > pair[0].version);
        }
    }

    #[test]
    fn fresh_database_reaches_latest() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();
        run_all(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, i64::from(latest_version()));
    }

    #[test]
    fn role_check_rejects_unknown_roles() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();
        let err = conn.execute(
            "INSERT INTO messages (id, conversation_id, role, content, timestamp) \
             VALUES ('m', 'c', 'system', 'x', '2024-01-01T00:00:00.000Z')",
            [],
        );
        assert!(err.is_err());
    }
}
