//! Resource and relation-link rows
//!
//! Rows are kind-agnostic; typed aggregates are assembled by
//! [`crate::services::store::ResourceRepository`].

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::RelationError;

// =============================================================================
// Types
// =============================================================================

/// Resource row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRow {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub details_json: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ResourceRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            kind: row.get("kind")?,
            title: row.get("title")?,
            description: row.get("description")?,
            details_json: row.get("details_json")?,
            version: row.get("version")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// One entry of an owner's relation mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub relation: String,
    pub child_id: String,
    pub child_title: String,
    pub child_version: i64,
    pub linked_at: String,
}

// =============================================================================
// Reads
// =============================================================================

/// Get a resource of the given kind by ID
pub fn get_resource(conn: &Connection, kind: &str, id: &str) -> Result<Option<ResourceRow>, RelationError> {
    let row = conn
        .query_row(
            "SELECT id, kind, title, description, details_json, version, created_at, updated_at
             FROM resources WHERE id = ? AND kind = ?",
            params![id, kind],
            |row| ResourceRow::from_row(row),
        )
        .optional()?;

    Ok(row)
}

/// Check whether a resource of the given kind exists
pub fn resource_exists(conn: &Connection, kind: &str, id: &str) -> Result<bool, RelationError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM resources WHERE id = ? AND kind = ?)",
        params![id, kind],
        |row| row.get(0),
    )?;

    Ok(exists)
}

/// List the relation mappings held by an owner
pub fn list_links(conn: &Connection, owner_id: &str) -> Result<Vec<LinkRow>, RelationError> {
    let mut stmt = conn.prepare(
        "SELECT relation, child_id, child_title, child_version, linked_at
         FROM resource_links WHERE owner_id = ? ORDER BY relation, child_id",
    )?;

    let rows = stmt.query_map(params![owner_id], |row| {
        Ok(LinkRow {
            relation: row.get(0)?,
            child_id: row.get(1)?,
            child_title: row.get(2)?,
            child_version: row.get(3)?,
            linked_at: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }

    Ok(results)
}

pub fn count_resources(conn: &Connection) -> Result<u64, RelationError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn count_links(conn: &Connection) -> Result<u64, RelationError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM resource_links", [], |row| row.get(0))?;
    Ok(count as u64)
}

// =============================================================================
// Writes
// =============================================================================

/// Insert a resource unless one with the same ID exists.
/// Returns whether a row was inserted.
pub fn insert_resource(conn: &Connection, row: &ResourceRow) -> Result<bool, RelationError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO resources
         (id, kind, title, description, details_json, version, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            row.id,
            row.kind,
            row.title,
            row.description,
            row.details_json,
            row.version,
            row.created_at,
            row.updated_at,
        ],
    )?;

    Ok(inserted > 0)
}

/// Delete a resource. Its own relation mappings go with it; links held by
/// other owners that point at it are left in place.
pub fn delete_resource(conn: &Connection, kind: &str, id: &str) -> Result<bool, RelationError> {
    let rows = conn.execute(
        "DELETE FROM resources WHERE id = ? AND kind = ?",
        params![id, kind],
    )?;

    Ok(rows > 0)
}

/// Atomically save a resource and replace its relation mappings.
///
/// `row.version` is the version the caller loaded. The save only applies
/// when the stored version still matches; otherwise nothing is written and
/// `Conflict` is returned. Returns the new version.
pub fn persist_resource(
    conn: &mut Connection,
    row: &ResourceRow,
    links: &[LinkRow],
) -> Result<i64, RelationError> {
    let tx = conn.transaction()?;

    let updated = tx.execute(
        "UPDATE resources
         SET title = ?, description = ?, details_json = ?, version = version + 1, updated_at = ?
         WHERE id = ? AND kind = ? AND version = ?",
        params![
            row.title,
            row.description,
            row.details_json,
            row.updated_at,
            row.id,
            row.kind,
            row.version,
        ],
    )?;

    if updated == 0 {
        // Dropping tx rolls back
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM resources WHERE id = ? AND kind = ?)",
            params![row.id, row.kind],
            |r| r.get(0),
        )?;
        return Err(if exists {
            RelationError::Conflict(format!(
                "{} '{}' was modified since version {}",
                row.kind, row.id, row.version
            ))
        } else {
            RelationError::NotFound(format!("{} '{}'", row.kind, row.id))
        });
    }

    tx.execute("DELETE FROM resource_links WHERE owner_id = ?", params![row.id])?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO resource_links
             (owner_id, relation, child_id, child_title, child_version, linked_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for link in links {
            stmt.execute(params![
                row.id,
                link.relation,
                link.child_id,
                link.child_title,
                link.child_version,
                link.linked_at,
            ])?;
        }
    }

    tx.commit()?;

    Ok(row.version + 1)
}
