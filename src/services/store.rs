//! Aggregate accessors
//!
//! [`AggregateStore`] is the narrow contract the linker consumes: load by id,
//! existence check, and atomic save. [`ResourceRepository`] implements it for
//! every aggregate kind on top of the SQLite rows in [`crate::db::resources`].

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{resources, Database, LinkRow, ResourceRow};
use crate::error::RelationError;
use crate::model::{Aggregate, ChildRef, ResourceMeta};

/// Access to the aggregates of one resource kind
pub trait AggregateStore: Send + Sync {
    type Entity: Aggregate;

    /// Load an aggregate with its relation mappings.
    /// Fails with `NotFound` if it does not exist.
    fn get(&self, id: Uuid) -> Result<Self::Entity, RelationError>;

    /// Check existence without loading
    fn does_exist(&self, id: Uuid) -> Result<bool, RelationError>;

    /// Save an aggregate and its relation mappings in one atomic step.
    ///
    /// The save is rejected with `Conflict` when the aggregate was persisted
    /// by someone else since it was loaded.
    fn persist(&self, entity: Self::Entity) -> Result<Self::Entity, RelationError>;
}

/// SQLite-backed store for one aggregate kind
pub struct ResourceRepository<A> {
    db: Arc<Database>,
    _kind: PhantomData<fn() -> A>,
}

impl<A: Aggregate> ResourceRepository<A> {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            _kind: PhantomData,
        }
    }

    /// Create a resource unless it already exists. Returns whether it was created.
    ///
    /// Relation mappings on `entity` are ignored; links are only made through
    /// the linker.
    pub fn insert(&self, entity: &A) -> Result<bool, RelationError> {
        let row = to_row(entity)?;
        let inserted = self.db.with_conn(|conn| resources::insert_resource(conn, &row))?;
        if inserted {
            debug!(kind = %A::KIND, id = %entity.id(), "Inserted resource");
        }
        Ok(inserted)
    }

    /// Delete a resource. Owners linking to it keep their references.
    pub fn delete(&self, id: Uuid) -> Result<bool, RelationError> {
        self.db.with_conn(|conn| {
            resources::delete_resource(conn, A::KIND.segment(), &id.to_string())
        })
    }
}

impl<A: Aggregate> AggregateStore for ResourceRepository<A> {
    type Entity = A;

    fn get(&self, id: Uuid) -> Result<A, RelationError> {
        let key = id.to_string();
        let (row, links) = self.db.with_conn(|conn| {
            let row = resources::get_resource(conn, A::KIND.segment(), &key)?
                .ok_or_else(|| RelationError::NotFound(format!("{} '{}'", A::KIND, id)))?;
            let links = resources::list_links(conn, &key)?;
            Ok((row, links))
        })?;

        from_rows(row, links)
    }

    fn does_exist(&self, id: Uuid) -> Result<bool, RelationError> {
        self.db.with_conn(|conn| {
            resources::resource_exists(conn, A::KIND.segment(), &id.to_string())
        })
    }

    fn persist(&self, mut entity: A) -> Result<A, RelationError> {
        let mut row = to_row(&entity)?;
        row.updated_at = chrono::Utc::now().to_rfc3339();
        let links = to_link_rows(&entity);

        let version = self
            .db
            .with_conn_mut(|conn| resources::persist_resource(conn, &row, &links))?;

        let meta = entity.meta_mut();
        meta.version = version;
        meta.updated_at = row.updated_at;

        debug!(kind = %A::KIND, id = %meta.id, version, links = links.len(), "Persisted resource");
        Ok(entity)
    }
}

fn to_row<A: Aggregate>(entity: &A) -> Result<ResourceRow, RelationError> {
    let meta = entity.meta();
    Ok(ResourceRow {
        id: meta.id.to_string(),
        kind: A::KIND.segment().to_string(),
        title: meta.title.clone(),
        description: meta.description.clone(),
        details_json: serde_json::to_string(entity.details())?,
        version: meta.version,
        created_at: meta.created_at.clone(),
        updated_at: meta.updated_at.clone(),
    })
}

fn to_link_rows<A: Aggregate>(entity: &A) -> Vec<LinkRow> {
    entity
        .relations()
        .into_iter()
        .flat_map(|(relation, members)| {
            members.values().map(move |child| LinkRow {
                relation: relation.to_string(),
                child_id: child.id.to_string(),
                child_title: child.title.clone(),
                child_version: child.version,
                linked_at: child.linked_at.clone(),
            })
        })
        .collect()
}

fn from_rows<A: Aggregate>(row: ResourceRow, links: Vec<LinkRow>) -> Result<A, RelationError> {
    let id = parse_uuid(&row.id)?;
    let details: A::Details = serde_json::from_str(&row.details_json)?;
    let meta = ResourceMeta {
        id,
        title: row.title,
        description: row.description,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };

    let mut entity = A::from_parts(meta, details);
    for link in links {
        let child = ChildRef {
            id: parse_uuid(&link.child_id)?,
            title: link.child_title,
            version: link.child_version,
            linked_at: link.linked_at,
        };
        match entity.relation_mut(&link.relation) {
            Some(members) => {
                members.insert(child.id, child);
            }
            None => {
                warn!(kind = %A::KIND, id = %id, relation = %link.relation, "Skipping link for unknown relation");
            }
        }
    }

    Ok(entity)
}

fn parse_uuid(value: &str) -> Result<Uuid, RelationError> {
    Uuid::parse_str(value)
        .map_err(|e| RelationError::Internal(format!("Stored id '{}' is not a UUID: {}", value, e)))
}
