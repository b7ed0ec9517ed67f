//! Seed import
//!
//! Creates resources listed in a JSON file. Resources that already exist are
//! left untouched, so the same file can be applied on every start. Seeding
//! never creates links; those go through the relation API.
//!
//! ```json
//! {
//!   "resources": [
//!     { "kind": "resources", "id": "…", "title": "Weather data",
//!       "details": { "keywords": ["weather"], "language": "en" } },
//!     { "kind": "representations", "id": "…", "title": "CSV export",
//!       "details": { "media_type": "text/csv" } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::RelationError;
use crate::model::{Aggregate, ResourceKind, ResourceMeta};
use crate::services::{ResourceRepository, Stores};

#[derive(Debug, Clone, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub resources: Vec<SeedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedResource {
    pub kind: ResourceKind,
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Kind-specific fields; omitted fields take their defaults
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Outcome of applying a seed file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub existing: usize,
}

/// Read a seed file
pub fn load_seed(path: &Path) -> Result<SeedFile, RelationError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Insert every seeded resource that does not exist yet
pub fn apply_seed(stores: &Stores, seed: &SeedFile) -> Result<SeedReport, RelationError> {
    let mut report = SeedReport::default();

    for resource in &seed.resources {
        let created = match resource.kind {
            ResourceKind::Catalog => insert(&stores.catalogs, resource)?,
            ResourceKind::OfferedResource => insert(&stores.resources, resource)?,
            ResourceKind::Representation => insert(&stores.representations, resource)?,
            ResourceKind::Artifact => insert(&stores.artifacts, resource)?,
            ResourceKind::Contract => insert(&stores.contracts, resource)?,
            ResourceKind::ContractRule => insert(&stores.rules, resource)?,
        };
        if created {
            report.created += 1;
        } else {
            report.existing += 1;
        }
    }

    info!(created = report.created, existing = report.existing, "Applied seed");
    Ok(report)
}

fn insert<A: Aggregate>(store: &ResourceRepository<A>, seed: &SeedResource) -> Result<bool, RelationError> {
    let details = match &seed.details {
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            RelationError::InvalidInput(format!("details of {} '{}': {}", seed.kind, seed.id, e))
        })?,
        None => A::Details::default(),
    };

    let mut meta = ResourceMeta::new(seed.id, seed.title.clone());
    meta.description = seed.description.clone();

    store.insert(&A::from_parts(meta, details))
}
