//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::RelationError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), RelationError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(RESOURCES_SCHEMA)?;
        conn.execute_batch(LINKS_SCHEMA)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(RelationError::Config(format!(
            "Database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, RelationError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), RelationError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    Ok(())
}

/// Resource aggregates of every kind
const RESOURCES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS resources (
    id TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    details_json TEXT NOT NULL DEFAULT '{}',
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_resources_kind ON resources(kind);
"#;

/// Owner-side relation mappings.
///
/// `child_id` is deliberately not a foreign key: children live in their own
/// store and may be deleted without touching the owners that reference them.
const LINKS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS resource_links (
    owner_id TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    relation TEXT NOT NULL,
    child_id TEXT NOT NULL,
    child_title TEXT NOT NULL,
    child_version INTEGER NOT NULL,
    linked_at TEXT NOT NULL,
    PRIMARY KEY (owner_id, relation, child_id)
);

CREATE INDEX IF NOT EXISTS idx_links_child ON resource_links(child_id);
"#;
