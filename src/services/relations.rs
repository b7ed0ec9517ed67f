//! Relations between connector resources
//!
//! Each type here wires one owner-side mapping into the generic
//! [`RelationLinker`].

use crate::model::{
    Artifact, Catalog, Contract, ContractRule, OfferedResource, RelationMap, Representation,
};

use super::linker::{RelationAccess, RelationLinker};
use super::store::ResourceRepository;

/// Catalog → offered resources
pub struct CatalogOffers;

impl RelationAccess for CatalogOffers {
    type Owner = Catalog;
    type Child = OfferedResource;
    const NAME: &'static str = Catalog::OFFERS;

    fn members(owner: &Catalog) -> &RelationMap {
        &owner.offers
    }

    fn members_mut(owner: &mut Catalog) -> &mut RelationMap {
        &mut owner.offers
    }
}

/// Offered resource → representations
pub struct ResourceRepresentations;

impl RelationAccess for ResourceRepresentations {
    type Owner = OfferedResource;
    type Child = Representation;
    const NAME: &'static str = OfferedResource::REPRESENTATIONS;

    fn members(owner: &OfferedResource) -> &RelationMap {
        &owner.representations
    }

    fn members_mut(owner: &mut OfferedResource) -> &mut RelationMap {
        &mut owner.representations
    }
}

/// Offered resource → contracts
pub struct ResourceContracts;

impl RelationAccess for ResourceContracts {
    type Owner = OfferedResource;
    type Child = Contract;
    const NAME: &'static str = OfferedResource::CONTRACTS;

    fn members(owner: &OfferedResource) -> &RelationMap {
        &owner.contracts
    }

    fn members_mut(owner: &mut OfferedResource) -> &mut RelationMap {
        &mut owner.contracts
    }
}

/// Representation → artifacts
pub struct RepresentationArtifacts;

impl RelationAccess for RepresentationArtifacts {
    type Owner = Representation;
    type Child = Artifact;
    const NAME: &'static str = Representation::ARTIFACTS;

    fn members(owner: &Representation) -> &RelationMap {
        &owner.artifacts
    }

    fn members_mut(owner: &mut Representation) -> &mut RelationMap {
        &mut owner.artifacts
    }
}

/// Contract → rules
pub struct ContractRules;

impl RelationAccess for ContractRules {
    type Owner = Contract;
    type Child = ContractRule;
    const NAME: &'static str = Contract::RULES;

    fn members(owner: &Contract) -> &RelationMap {
        &owner.rules
    }

    fn members_mut(owner: &mut Contract) -> &mut RelationMap {
        &mut owner.rules
    }
}

/// Linker over SQLite-backed stores for relation `R`
pub type RepositoryLinker<R> = RelationLinker<
    R,
    ResourceRepository<<R as RelationAccess>::Owner>,
    ResourceRepository<<R as RelationAccess>::Child>,
>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Aggregate, ResourceMeta};
    use uuid::Uuid;

    #[test]
    fn test_owner_relation_names_match_mapping_fields() {
        let mut resource = OfferedResource::from_parts(
            ResourceMeta::new(Uuid::new_v4(), "Weather data"),
            Default::default(),
        );
        let id = Uuid::new_v4();
        ResourceContracts::members_mut(&mut resource).insert(
            id,
            crate::model::ChildRef {
                id,
                title: "contract".into(),
                version: 0,
                linked_at: String::new(),
            },
        );

        // The name-based lookup used when loading links must hit the same map
        let by_name = resource.relation_mut(ResourceContracts::NAME).unwrap();
        assert!(by_name.contains_key(&id));
        assert!(ResourceRepresentations::members(&resource).is_empty());
    }
}
