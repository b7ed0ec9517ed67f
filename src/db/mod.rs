//! SQLite database module for resources and their relation mappings
//!
//! ## Tables
//!
//! - `resources` - Every resource aggregate (id, kind, title, details JSON, version)
//! - `resource_links` - Owner-side relation mappings (owner, relation, child reference)

pub mod schema;
pub mod resources;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::RelationError;

/// SQLite database for resources and links
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self, RelationError> {
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)?;

        // WAL for concurrent readers while a persist is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, RelationError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, RelationError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read operation against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, RelationError>
    where
        F: FnOnce(&Connection) -> Result<T, RelationError>,
    {
        let conn = self.conn.lock()
            .map_err(|e| RelationError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, RelationError>
    where
        F: FnOnce(&mut Connection) -> Result<T, RelationError>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| RelationError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, RelationError> {
        self.with_conn(|conn| {
            Ok(DbStats {
                resource_count: resources::count_resources(conn)?,
                link_count: resources::count_links(conn)?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub resource_count: u64,
    pub link_count: u64,
}

pub use resources::{LinkRow, ResourceRow};
