//! Database schema definitions.

use clockmail_core::StorageError;
use rusqlite::Connection;
use tracing::info;

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema, creating or migrating as needed.
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    let current = get_schema_version(conn)?;

    if current == 0 {
        info!("creating database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(TABLES_SCHEMA)
            .map_err(|e| StorageError::MigrationFailed {
                reason: e.to_string(),
            })?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current < SCHEMA_VERSION {
        info!("migrating schema from v{} to v{}", current, SCHEMA_VERSION);
        migrate_schema(conn, current)?;
    }

    Ok(())
}

/// Current schema version (0 if not initialized).
fn get_schema_version(conn: &Connection) -> Result<i32, StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| StorageError::MigrationFailed {
        reason: e.to_string(),
    })?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| StorageError::MigrationFailed {
            reason: e.to_string(),
        })?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| StorageError::MigrationFailed {
            reason: e.to_string(),
        })?;
    Ok(())
}

fn migrate_schema(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    // Add migration steps here as the schema evolves.
    set_schema_version(conn, from_version.max(SCHEMA_VERSION))
}

const TABLES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS agents (
    id         TEXT PRIMARY KEY,
    clock      INTEGER NOT NULL DEFAULT 0,
    epoch      INTEGER NOT NULL DEFAULT 0,
    round      INTEGER NOT NULL DEFAULT 0,
    registered TEXT NOT NULL,
    last_seen  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id   TEXT NOT NULL REFERENCES agents(id),
    lamport_ts INTEGER NOT NULL,
    epoch      INTEGER NOT NULL DEFAULT 0,
    round      INTEGER NOT NULL DEFAULT 0,
    kind       TEXT NOT NULL,
    target     TEXT,
    body       TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_lamport ON events(lamport_ts);
CREATE INDEX IF NOT EXISTS idx_events_agent ON events(agent_id, lamport_ts);
CREATE INDEX IF NOT EXISTS idx_events_kind_target ON events(kind, target);
CREATE INDEX IF NOT EXISTS idx_events_epoch_round ON events(epoch, round);

CREATE TABLE IF NOT EXISTS locks (
    path       TEXT NOT NULL,
    agent_id   TEXT NOT NULL REFERENCES agents(id),
    lamport_ts INTEGER NOT NULL,
    epoch      INTEGER NOT NULL DEFAULT 0,
    exclusive  INTEGER NOT NULL DEFAULT 1,
    expires_at TEXT NOT NULL,
    PRIMARY KEY (path, agent_id)
);
CREATE INDEX IF NOT EXISTS idx_locks_agent ON locks(agent_id);

CREATE TABLE IF NOT EXISTS cursors (
    agent_id   TEXT PRIMARY KEY REFERENCES agents(id),
    since_ts   INTEGER NOT NULL DEFAULT 0
);
"#;
