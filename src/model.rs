//! Resource aggregates of the connector
//!
//! Every aggregate shares [`ResourceMeta`] and carries kind-specific
//! `details`. Aggregates that own relations hold one [`RelationMap`] per
//! relation; only the owner side of a relation is materialized.
//!
//! ```text
//! Catalog ──offers──▶ OfferedResource ──representations──▶ Representation ──artifacts──▶ Artifact
//!                                     └──contracts──────▶ Contract ──rules──▶ ContractRule
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resource kinds exposed by the connector.
///
/// The serialized form is the URL segment used in routes and external
/// identifiers, and the `kind` column in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "catalogs")]
    Catalog,
    #[serde(rename = "resources")]
    OfferedResource,
    #[serde(rename = "representations")]
    Representation,
    #[serde(rename = "artifacts")]
    Artifact,
    #[serde(rename = "contracts")]
    Contract,
    #[serde(rename = "rules")]
    ContractRule,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Catalog,
        ResourceKind::OfferedResource,
        ResourceKind::Representation,
        ResourceKind::Artifact,
        ResourceKind::Contract,
        ResourceKind::ContractRule,
    ];

    /// URL segment for this kind
    pub fn segment(&self) -> &'static str {
        match self {
            ResourceKind::Catalog => "catalogs",
            ResourceKind::OfferedResource => "resources",
            ResourceKind::Representation => "representations",
            ResourceKind::Artifact => "artifacts",
            ResourceKind::Contract => "contracts",
            ResourceKind::ContractRule => "rules",
        }
    }

    /// Parse a URL segment
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.segment() == segment)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Metadata shared by every resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Optimistic concurrency counter, bumped on every persist
    #[serde(default)]
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ResourceMeta {
    /// Metadata for a resource that has not been stored yet
    pub fn new(id: Uuid, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            title: title.into(),
            description: None,
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Reference to a linked child, captured when the link was made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    pub id: Uuid,
    pub title: String,
    /// Child version at link time
    pub version: i64,
    pub linked_at: String,
}

impl ChildRef {
    /// Capture a reference to a loaded child
    pub fn capture<A: Aggregate>(child: &A) -> Self {
        let meta = child.meta();
        Self {
            id: meta.id,
            title: meta.title.clone(),
            version: meta.version,
            linked_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Child id → child reference for one relation of one owner
pub type RelationMap = HashMap<Uuid, ChildRef>;

/// An aggregate root stored by a [`crate::services::store::AggregateStore`]
pub trait Aggregate: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Kind-specific fields, stored as JSON
    type Details: Serialize + DeserializeOwned + Default + Clone + Send + Sync;

    /// Build an aggregate with empty relation mappings
    fn from_parts(meta: ResourceMeta, details: Self::Details) -> Self;

    fn meta(&self) -> &ResourceMeta;

    fn meta_mut(&mut self) -> &mut ResourceMeta;

    fn details(&self) -> &Self::Details;

    /// Relation mappings owned by this aggregate, by relation name
    fn relations(&self) -> Vec<(&'static str, &RelationMap)> {
        Vec::new()
    }

    /// Mutable access to one relation mapping, used when loading links
    fn relation_mut(&mut self, _name: &str) -> Option<&mut RelationMap> {
        None
    }

    fn id(&self) -> Uuid {
        self.meta().id
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDetails {}

/// Catalog grouping offered resources
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub meta: ResourceMeta,
    pub details: CatalogDetails,
    pub offers: RelationMap,
}

impl Catalog {
    pub const OFFERS: &'static str = "offers";
}

impl Aggregate for Catalog {
    const KIND: ResourceKind = ResourceKind::Catalog;
    type Details = CatalogDetails;

    fn from_parts(meta: ResourceMeta, details: Self::Details) -> Self {
        Self { meta, details, offers: RelationMap::new() }
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn details(&self) -> &Self::Details {
        &self.details
    }

    fn relations(&self) -> Vec<(&'static str, &RelationMap)> {
        vec![(Self::OFFERS, &self.offers)]
    }

    fn relation_mut(&mut self, name: &str) -> Option<&mut RelationMap> {
        match name {
            Self::OFFERS => Some(&mut self.offers),
            _ => None,
        }
    }
}

// =============================================================================
// Offered resource
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferedResourceDetails {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub license: Option<String>,
}

/// Resource offered by the connector
#[derive(Debug, Clone, PartialEq)]
pub struct OfferedResource {
    pub meta: ResourceMeta,
    pub details: OfferedResourceDetails,
    pub representations: RelationMap,
    pub contracts: RelationMap,
}

impl OfferedResource {
    pub const REPRESENTATIONS: &'static str = "representations";
    pub const CONTRACTS: &'static str = "contracts";
}

impl Aggregate for OfferedResource {
    const KIND: ResourceKind = ResourceKind::OfferedResource;
    type Details = OfferedResourceDetails;

    fn from_parts(meta: ResourceMeta, details: Self::Details) -> Self {
        Self {
            meta,
            details,
            representations: RelationMap::new(),
            contracts: RelationMap::new(),
        }
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn details(&self) -> &Self::Details {
        &self.details
    }

    fn relations(&self) -> Vec<(&'static str, &RelationMap)> {
        vec![
            (Self::REPRESENTATIONS, &self.representations),
            (Self::CONTRACTS, &self.contracts),
        ]
    }

    fn relation_mut(&mut self, name: &str) -> Option<&mut RelationMap> {
        match name {
            Self::REPRESENTATIONS => Some(&mut self.representations),
            Self::CONTRACTS => Some(&mut self.contracts),
            _ => None,
        }
    }
}

// =============================================================================
// Representation
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepresentationDetails {
    pub media_type: Option<String>,
    pub language: Option<String>,
}

/// Alternative form in which a resource is offered
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub meta: ResourceMeta,
    pub details: RepresentationDetails,
    pub artifacts: RelationMap,
}

impl Representation {
    pub const ARTIFACTS: &'static str = "artifacts";
}

impl Aggregate for Representation {
    const KIND: ResourceKind = ResourceKind::Representation;
    type Details = RepresentationDetails;

    fn from_parts(meta: ResourceMeta, details: Self::Details) -> Self {
        Self { meta, details, artifacts: RelationMap::new() }
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn details(&self) -> &Self::Details {
        &self.details
    }

    fn relations(&self) -> Vec<(&'static str, &RelationMap)> {
        vec![(Self::ARTIFACTS, &self.artifacts)]
    }

    fn relation_mut(&mut self, name: &str) -> Option<&mut RelationMap> {
        match name {
            Self::ARTIFACTS => Some(&mut self.artifacts),
            _ => None,
        }
    }
}

// =============================================================================
// Artifact
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDetails {
    pub byte_size: Option<i64>,
    pub checksum: Option<String>,
}

/// Data artifact behind a representation
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub meta: ResourceMeta,
    pub details: ArtifactDetails,
}

impl Aggregate for Artifact {
    const KIND: ResourceKind = ResourceKind::Artifact;
    type Details = ArtifactDetails;

    fn from_parts(meta: ResourceMeta, details: Self::Details) -> Self {
        Self { meta, details }
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn details(&self) -> &Self::Details {
        &self.details
    }
}

// =============================================================================
// Contract
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDetails {
    pub provider: Option<String>,
    pub consumer: Option<String>,
}

/// Usage contract attached to an offered resource
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub meta: ResourceMeta,
    pub details: ContractDetails,
    pub rules: RelationMap,
}

impl Contract {
    pub const RULES: &'static str = "rules";
}

impl Aggregate for Contract {
    const KIND: ResourceKind = ResourceKind::Contract;
    type Details = ContractDetails;

    fn from_parts(meta: ResourceMeta, details: Self::Details) -> Self {
        Self { meta, details, rules: RelationMap::new() }
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn details(&self) -> &Self::Details {
        &self.details
    }

    fn relations(&self) -> Vec<(&'static str, &RelationMap)> {
        vec![(Self::RULES, &self.rules)]
    }

    fn relation_mut(&mut self, name: &str) -> Option<&mut RelationMap> {
        match name {
            Self::RULES => Some(&mut self.rules),
            _ => None,
        }
    }
}

// =============================================================================
// Contract rule
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractRuleDetails {
    #[serde(default)]
    pub value: String,
}

/// Single usage-control rule of a contract
#[derive(Debug, Clone, PartialEq)]
pub struct ContractRule {
    pub meta: ResourceMeta,
    pub details: ContractRuleDetails,
}

impl Aggregate for ContractRule {
    const KIND: ResourceKind = ResourceKind::ContractRule;
    type Details = ContractRuleDetails;

    fn from_parts(meta: ResourceMeta, details: Self::Details) -> Self {
        Self { meta, details }
    }

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn details(&self) -> &Self::Details {
        &self.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_segments_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_segment(kind.segment()), Some(kind));
        }
        assert_eq!(ResourceKind::from_segment("widgets"), None);
    }

    #[test]
    fn test_kind_serializes_as_segment() {
        let json = serde_json::to_string(&ResourceKind::OfferedResource).unwrap();
        assert_eq!(json, "\"resources\"");
    }

    #[test]
    fn test_relation_lookup_by_name() {
        let mut resource = OfferedResource::from_parts(
            ResourceMeta::new(Uuid::new_v4(), "Weather data"),
            OfferedResourceDetails::default(),
        );
        assert!(resource.relation_mut(OfferedResource::CONTRACTS).is_some());
        assert!(resource.relation_mut("artifacts").is_none());
        assert_eq!(resource.relations().len(), 2);

        let artifact = Artifact::from_parts(
            ResourceMeta::new(Uuid::new_v4(), "raw.csv"),
            ArtifactDetails::default(),
        );
        assert!(artifact.relations().is_empty());
    }

    #[test]
    fn test_child_ref_captures_meta() {
        let mut meta = ResourceMeta::new(Uuid::new_v4(), "JSON export");
        meta.version = 3;
        let representation = Representation::from_parts(meta.clone(), Default::default());

        let child = ChildRef::capture(&representation);
        assert_eq!(child.id, meta.id);
        assert_eq!(child.title, "JSON export");
        assert_eq!(child.version, 3);
    }
}
