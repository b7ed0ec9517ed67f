//! Relation endpoints - HTTP verbs over a relation linker
//!
//! | Verb | Linker call | Success |
//! |--------|------------------|----------------------------------|
//! | GET | `get` | 200, linked ids |
//! | POST | `add` then `get` | 200, linked ids after the change |
//! | PUT | `replace` | 204 |
//! | DELETE | `remove` | 204 |

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response};

use crate::error::RelationError;
use crate::identifier::{EndpointId, IdentifierResolver};
use crate::model::{Aggregate, ResourceKind};

use super::linker::{RelationAccess, RelationLinker};
use super::response::{self, HandlerResult};
use super::store::AggregateStore;

/// Route handler for one relation, independent of its concrete types
pub trait RelationEndpoint: Send + Sync {
    fn owner_kind(&self) -> ResourceKind;

    fn relation(&self) -> &'static str;

    fn child_kind(&self) -> ResourceKind;

    fn read(&self, owner: &EndpointId) -> Result<Vec<EndpointId>, RelationError>;

    fn append(&self, owner: &EndpointId, children: &[EndpointId]) -> Result<Vec<EndpointId>, RelationError>;

    fn replace(&self, owner: &EndpointId, children: &[EndpointId]) -> Result<(), RelationError>;

    fn delete(&self, owner: &EndpointId, children: &[EndpointId]) -> Result<(), RelationError>;
}

/// [`RelationEndpoint`] backed by a [`RelationLinker`]
pub struct LinkerEndpoint<R, O, C> {
    linker: RelationLinker<R, O, C>,
    resolver: IdentifierResolver,
}

impl<R, O, C> LinkerEndpoint<R, O, C> {
    pub fn new(linker: RelationLinker<R, O, C>, resolver: IdentifierResolver) -> Self {
        Self { linker, resolver }
    }
}

impl<R, O, C> RelationEndpoint for LinkerEndpoint<R, O, C>
where
    R: RelationAccess,
    O: AggregateStore<Entity = R::Owner> + 'static,
    C: AggregateStore<Entity = R::Child> + 'static,
{
    fn owner_kind(&self) -> ResourceKind {
        <R::Owner as Aggregate>::KIND
    }

    fn relation(&self) -> &'static str {
        R::NAME
    }

    fn child_kind(&self) -> ResourceKind {
        <R::Child as Aggregate>::KIND
    }

    fn read(&self, owner: &EndpointId) -> Result<Vec<EndpointId>, RelationError> {
        let owner_id = self.resolver.resolve_as(owner, self.owner_kind())?;
        let ids = self.linker.get(owner_id)?;
        Ok(ids
            .into_iter()
            .map(|id| self.resolver.endpoint_id(self.child_kind(), id))
            .collect())
    }

    fn append(&self, owner: &EndpointId, children: &[EndpointId]) -> Result<Vec<EndpointId>, RelationError> {
        let owner_id = self.resolver.resolve_as(owner, self.owner_kind())?;
        let ids = self.resolver.resolve_all(children, self.child_kind())?;
        self.linker.add(owner_id, &ids)?;
        self.read(owner)
    }

    fn replace(&self, owner: &EndpointId, children: &[EndpointId]) -> Result<(), RelationError> {
        let owner_id = self.resolver.resolve_as(owner, self.owner_kind())?;
        let ids = self.resolver.resolve_all(children, self.child_kind())?;
        self.linker.replace(owner_id, &ids)
    }

    fn delete(&self, owner: &EndpointId, children: &[EndpointId]) -> Result<(), RelationError> {
        let owner_id = self.resolver.resolve_as(owner, self.owner_kind())?;
        let ids = self.resolver.resolve_all(children, self.child_kind())?;
        self.linker.remove(owner_id, &ids)
    }
}

/// Answer one request against a relation endpoint
pub fn handle(
    endpoint: &dyn RelationEndpoint,
    method: &Method,
    owner: &EndpointId,
    body: &[u8],
) -> Response<Full<Bytes>> {
    response::from_handler(dispatch(endpoint, method, owner, body))
}

fn dispatch(
    endpoint: &dyn RelationEndpoint,
    method: &Method,
    owner: &EndpointId,
    body: &[u8],
) -> HandlerResult {
    match *method {
        Method::GET => Ok(response::ok(&endpoint.read(owner)?)),
        Method::POST => {
            let children = parse_children(body)?;
            Ok(response::ok(&endpoint.append(owner, &children)?))
        }
        Method::PUT => {
            let children = parse_children(body)?;
            endpoint.replace(owner, &children)?;
            Ok(response::no_content())
        }
        Method::DELETE => {
            let children = parse_children(body)?;
            endpoint.delete(owner, &children)?;
            Ok(response::no_content())
        }
        _ => Ok(response::method_not_allowed()),
    }
}

/// Parse a JSON array of child identifiers
fn parse_children(body: &[u8]) -> Result<Vec<EndpointId>, RelationError> {
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hyper::StatusCode;
    use uuid::Uuid;

    use crate::db::Database;
    use crate::model::{Contract, ContractRule, ResourceMeta};
    use crate::services::relations::ContractRules;
    use crate::services::store::ResourceRepository;

    struct Fixture {
        endpoint: LinkerEndpoint<ContractRules, ResourceRepository<Contract>, ResourceRepository<ContractRule>>,
        rules: Arc<ResourceRepository<ContractRule>>,
        resolver: IdentifierResolver,
        owner: EndpointId,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Arc::new(Database::open_in_memory().unwrap());
            let contracts = Arc::new(ResourceRepository::<Contract>::new(db.clone()));
            let rules = Arc::new(ResourceRepository::<ContractRule>::new(db));

            let contract = Contract::from_parts(ResourceMeta::new(Uuid::new_v4(), "Usage"), Default::default());
            contracts.insert(&contract).unwrap();

            let resolver = IdentifierResolver::new("/api/v2");
            let owner = resolver.endpoint_id(ResourceKind::Contract, contract.id());
            let linker = RelationLinker::new(contracts, rules.clone());

            Self {
                endpoint: LinkerEndpoint::new(linker, resolver.clone()),
                rules,
                resolver,
                owner,
            }
        }

        fn rule(&self) -> EndpointId {
            let rule = ContractRule::from_parts(ResourceMeta::new(Uuid::new_v4(), "no-resale"), Default::default());
            self.rules.insert(&rule).unwrap();
            self.resolver.endpoint_id(ResourceKind::ContractRule, rule.id())
        }

        fn call(&self, method: Method, body: &str) -> Response<Full<Bytes>> {
            handle(&self.endpoint, &method, &self.owner, body.as_bytes())
        }
    }

    #[test]
    fn test_describes_relation() {
        let f = Fixture::new();
        assert_eq!(f.endpoint.owner_kind(), ResourceKind::Contract);
        assert_eq!(f.endpoint.relation(), "rules");
        assert_eq!(f.endpoint.child_kind(), ResourceKind::ContractRule);
    }

    #[test]
    fn test_append_returns_full_membership() {
        let f = Fixture::new();
        let first = f.rule();
        let second = f.rule();

        f.endpoint.append(&f.owner, &[first.clone()]).unwrap();
        let mut members = f.endpoint.append(&f.owner, &[second.clone(), second.clone()]).unwrap();
        members.sort();

        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(members, expected);
    }

    #[test]
    fn test_verb_statuses() {
        let f = Fixture::new();
        let rule = f.rule();
        let body = serde_json::to_string(&[&rule]).unwrap();

        assert_eq!(f.call(Method::GET, "").status(), StatusCode::OK);
        assert_eq!(f.call(Method::POST, &body).status(), StatusCode::OK);
        assert_eq!(f.call(Method::PUT, &body).status(), StatusCode::NO_CONTENT);
        assert_eq!(f.call(Method::DELETE, &body).status(), StatusCode::NO_CONTENT);
        assert_eq!(f.call(Method::PATCH, &body).status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_bad_bodies_are_rejected() {
        let f = Fixture::new();
        assert_eq!(f.call(Method::POST, "not json").status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.call(Method::PUT, r#"{"ids": []}"#).status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.call(Method::DELETE, r#"["/api/v2/rules/nope"]"#).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_child_of_other_kind_is_rejected_before_linking() {
        let f = Fixture::new();
        let wrong = f.resolver.endpoint_id(ResourceKind::Artifact, Uuid::new_v4());
        let result = f.endpoint.append(&f.owner, &[wrong]);
        assert!(matches!(result, Err(RelationError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_child_is_bad_request() {
        let f = Fixture::new();
        let ghost = f.resolver.endpoint_id(ResourceKind::ContractRule, Uuid::new_v4());
        let body = serde_json::to_string(&[ghost]).unwrap();
        assert_eq!(f.call(Method::POST, &body).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_owner_is_not_found() {
        let f = Fixture::new();
        let owner = f.resolver.endpoint_id(ResourceKind::Contract, Uuid::new_v4());
        let response = handle(&f.endpoint, &Method::GET, &owner, b"");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
