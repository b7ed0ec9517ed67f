//! Service layer for connector-relations
//!
//! ## Architecture
//!
//! ```text
//! HTTP router (thin)
//!     ↓
//! Relation endpoints (verbs → linker calls, external ids)
//!     ↓
//! Relation linkers (membership rules, one persist per call)
//!     ↓
//! Aggregate stores (db/*.rs)
//!     ↓
//! SQLite Database
//! ```
//!
//! Everything is wired explicitly in [`Services::new`]; there is no global
//! registry.

pub mod response;
pub mod events;
pub mod store;
pub mod linker;
pub mod relations;
pub mod endpoint;

pub use endpoint::{LinkerEndpoint, RelationEndpoint};
pub use events::{EventBus, EventListener, RelationEvent};
pub use linker::{LinkerPolicy, RelationAccess, RelationLinker};
pub use store::{AggregateStore, ResourceRepository};

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Database;
use crate::identifier::IdentifierResolver;
use crate::model::{
    Aggregate, Artifact, Catalog, Contract, ContractRule, OfferedResource, Representation,
    ResourceKind,
};

use relations::{
    CatalogOffers, ContractRules, RepresentationArtifacts, ResourceContracts,
    ResourceRepresentations,
};

/// One store per resource kind, sharing the database
pub struct Stores {
    pub catalogs: Arc<ResourceRepository<Catalog>>,
    pub resources: Arc<ResourceRepository<OfferedResource>>,
    pub representations: Arc<ResourceRepository<Representation>>,
    pub artifacts: Arc<ResourceRepository<Artifact>>,
    pub contracts: Arc<ResourceRepository<Contract>>,
    pub rules: Arc<ResourceRepository<ContractRule>>,
}

impl Stores {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            catalogs: Arc::new(ResourceRepository::new(db.clone())),
            resources: Arc::new(ResourceRepository::new(db.clone())),
            representations: Arc::new(ResourceRepository::new(db.clone())),
            artifacts: Arc::new(ResourceRepository::new(db.clone())),
            contracts: Arc::new(ResourceRepository::new(db.clone())),
            rules: Arc::new(ResourceRepository::new(db)),
        }
    }
}

/// Relation endpoints keyed by owner kind and relation name
#[derive(Default)]
pub struct RelationRegistry {
    endpoints: HashMap<(ResourceKind, &'static str), Arc<dyn RelationEndpoint>>,
}

impl RelationRegistry {
    pub fn register(&mut self, endpoint: Arc<dyn RelationEndpoint>) {
        self.endpoints
            .insert((endpoint.owner_kind(), endpoint.relation()), endpoint);
    }

    pub fn lookup(&self, owner_kind: ResourceKind, relation: &str) -> Option<Arc<dyn RelationEndpoint>> {
        self.endpoints
            .iter()
            .find(|((kind, name), _)| *kind == owner_kind && *name == relation)
            .map(|(_, endpoint)| endpoint.clone())
    }

    /// Registered `(owner kind, relation, child kind)` triples, sorted
    pub fn routes(&self) -> Vec<(ResourceKind, &'static str, ResourceKind)> {
        let mut routes: Vec<_> = self
            .endpoints
            .values()
            .map(|e| (e.owner_kind(), e.relation(), e.child_kind()))
            .collect();
        routes.sort();
        routes
    }
}

/// Service container
///
/// Pass this to HttpServer for handler access.
pub struct Services {
    pub db: Arc<Database>,
    pub stores: Stores,
    pub relations: RelationRegistry,
    pub resolver: IdentifierResolver,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create stores, linkers and relation endpoints over a shared database
    pub fn new(db: Arc<Database>, resolver: IdentifierResolver, policy: LinkerPolicy) -> Self {
        let stores = Stores::new(db.clone());
        let events = Arc::new(EventBus::new());

        let mut relations = RelationRegistry::default();
        register::<CatalogOffers, _, _>(&mut relations, &stores.catalogs, &stores.resources, &resolver, policy, &events);
        register::<ResourceRepresentations, _, _>(&mut relations, &stores.resources, &stores.representations, &resolver, policy, &events);
        register::<ResourceContracts, _, _>(&mut relations, &stores.resources, &stores.contracts, &resolver, policy, &events);
        register::<RepresentationArtifacts, _, _>(&mut relations, &stores.representations, &stores.artifacts, &resolver, policy, &events);
        register::<ContractRules, _, _>(&mut relations, &stores.contracts, &stores.rules, &resolver, policy, &events);

        Self {
            db,
            stores,
            relations,
            resolver,
            events,
        }
    }
}

fn register<R, O, C>(
    registry: &mut RelationRegistry,
    owners: &Arc<ResourceRepository<O>>,
    children: &Arc<ResourceRepository<C>>,
    resolver: &IdentifierResolver,
    policy: LinkerPolicy,
    events: &Arc<EventBus>,
) where
    R: RelationAccess<Owner = O, Child = C>,
    O: Aggregate,
    C: Aggregate,
{
    let linker = RelationLinker::<R, _, _>::new(owners.clone(), children.clone())
        .with_policy(policy)
        .with_events(events.clone());
    registry.register(Arc::new(LinkerEndpoint::new(linker, resolver.clone())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_relations_registered() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let services = Services::new(db, IdentifierResolver::new("/api/v2"), LinkerPolicy::default());

        assert_eq!(
            services.relations.routes(),
            vec![
                (ResourceKind::Catalog, "offers", ResourceKind::OfferedResource),
                (ResourceKind::OfferedResource, "contracts", ResourceKind::Contract),
                (ResourceKind::OfferedResource, "representations", ResourceKind::Representation),
                (ResourceKind::Representation, "artifacts", ResourceKind::Artifact),
                (ResourceKind::Contract, "rules", ResourceKind::ContractRule),
            ]
        );
    }

    #[test]
    fn test_lookup_misses() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let services = Services::new(db, IdentifierResolver::new("/api/v2"), LinkerPolicy::default());

        assert!(services.relations.lookup(ResourceKind::Artifact, "representations").is_none());
        assert!(services.relations.lookup(ResourceKind::OfferedResource, "rules").is_none());
        assert!(services.relations.lookup(ResourceKind::OfferedResource, "representations").is_some());
    }
}
