//! Integration tests for the relation API
//!
//! Requests go through `HttpServer::route`, the same path a network request
//! takes once its body has been read.

use bytes::Bytes;
use connector_relations::model::{Aggregate, OfferedResource, Representation, ResourceKind, ResourceMeta};
use connector_relations::services::AggregateStore;
use connector_relations::{Database, EndpointId, HttpServer, IdentifierResolver, LinkerPolicy, Services};
use http_body_util::{BodyExt, Full};
use hyper::{Method, Response, StatusCode};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

const BASE: &str = "/api/v2";

struct TestApi {
    server: HttpServer,
    services: Arc<Services>,
}

impl TestApi {
    fn new(db: Database) -> Self {
        Self::with_policy(db, LinkerPolicy::default())
    }

    fn with_policy(db: Database, policy: LinkerPolicy) -> Self {
        let services = Arc::new(Services::new(Arc::new(db), IdentifierResolver::new(BASE), policy));
        let server = HttpServer::new(services.clone(), "127.0.0.1:0".parse().unwrap());
        Self { server, services }
    }

    fn offered_resource(&self) -> Uuid {
        let resource = OfferedResource::from_parts(
            ResourceMeta::new(Uuid::new_v4(), "Weather data"),
            Default::default(),
        );
        self.services.stores.resources.insert(&resource).unwrap();
        resource.id()
    }

    fn representation(&self, title: &str) -> EndpointId {
        let representation = Representation::from_parts(
            ResourceMeta::new(Uuid::new_v4(), title),
            Default::default(),
        );
        self.services.stores.representations.insert(&representation).unwrap();
        self.services
            .resolver
            .endpoint_id(ResourceKind::Representation, representation.id())
    }

    fn path(owner: Uuid) -> String {
        format!("{}/resources/{}/representations", BASE, owner)
    }

    fn call(&self, method: Method, owner: Uuid, ids: &[&EndpointId]) -> Response<Full<Bytes>> {
        let body = if method == Method::GET {
            Vec::new()
        } else {
            serde_json::to_vec(ids).unwrap()
        };
        self.server.route(&method, &Self::path(owner), &body)
    }

    async fn members(&self, owner: Uuid) -> Vec<EndpointId> {
        let response = self.call(Method::GET, owner, &[]);
        assert_eq!(response.status(), StatusCode::OK);
        sorted(body_json(response).await)
    }
}

async fn body_json(response: Response<Full<Bytes>>) -> Vec<EndpointId> {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn sorted(mut ids: Vec<EndpointId>) -> Vec<EndpointId> {
    ids.sort();
    ids
}

/// Owner starts empty; add, replace, remove, then remove something never linked
#[tokio::test]
async fn test_membership_lifecycle() {
    let api = TestApi::new(Database::open_in_memory().unwrap());
    let owner = api.offered_resource();
    let r1 = api.representation("r1");
    let r2 = api.representation("r2");
    let r3 = api.representation("r3");
    let r9 = api.representation("r9");

    assert!(api.members(owner).await.is_empty());

    let response = api.call(Method::POST, owner, &[&r1, &r2]);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sorted(body_json(response).await), sorted(vec![r1.clone(), r2.clone()]));

    let response = api.call(Method::PUT, owner, &[&r3]);
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(api.members(owner).await, vec![r3.clone()]);

    let response = api.call(Method::DELETE, owner, &[&r3]);
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(api.members(owner).await.is_empty());

    let response = api.call(Method::DELETE, owner, &[&r9]);
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(api.members(owner).await.is_empty());
}

#[tokio::test]
async fn test_unknown_owner_is_not_found() {
    let api = TestApi::new(Database::open_in_memory().unwrap());
    let response = api.call(Method::GET, Uuid::new_v4(), &[]);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_add_leaves_membership_unchanged() {
    let api = TestApi::new(Database::open_in_memory().unwrap());
    let owner = api.offered_resource();
    let existing = api.representation("existing");
    let c1 = api.representation("c1");
    let missing = api
        .services
        .resolver
        .endpoint_id(ResourceKind::Representation, Uuid::new_v4());

    api.call(Method::POST, owner, &[&existing]);
    let response = api.call(Method::POST, owner, &[&c1, &missing]);

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(api.members(owner).await, vec![existing]);
}

#[tokio::test]
async fn test_duplicate_ids_in_body_collapse() {
    let api = TestApi::new(Database::open_in_memory().unwrap());
    let owner = api.offered_resource();
    let r1 = api.representation("r1");

    let response = api.call(Method::POST, owner, &[&r1, &r1, &r1]);
    assert_eq!(body_json(response).await, vec![r1]);
}

#[tokio::test]
async fn test_relations_are_independent() {
    let api = TestApi::new(Database::open_in_memory().unwrap());
    let owner = api.offered_resource();
    let r1 = api.representation("r1");
    api.call(Method::POST, owner, &[&r1]);

    let contracts = api.server.route(
        &Method::GET,
        &format!("{}/resources/{}/contracts", BASE, owner),
        b"",
    );
    assert_eq!(contracts.status(), StatusCode::OK);
    assert!(body_json(contracts).await.is_empty());
    assert_eq!(api.members(owner).await, vec![r1]);
}

#[tokio::test]
async fn test_strict_remove_rejects_deleted_child() {
    let api = TestApi::with_policy(
        Database::open_in_memory().unwrap(),
        LinkerPolicy { require_existing_child_on_remove: true },
    );
    let owner = api.offered_resource();
    let r1 = api.representation("r1");
    api.call(Method::POST, owner, &[&r1]);

    let child_id = api.services.resolver.resolve(&r1).unwrap().id;
    api.services.stores.representations.delete(child_id).unwrap();

    let response = api.call(Method::DELETE, owner, &[&r1]);
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(api.members(owner).await, vec![r1]);
}

#[tokio::test]
async fn test_memberships_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("relations.db");

    let (owner, r1) = {
        let api = TestApi::new(Database::open(&db_path).unwrap());
        let owner = api.offered_resource();
        let r1 = api.representation("r1");
        assert_eq!(api.call(Method::POST, owner, &[&r1]).status(), StatusCode::OK);
        (owner, r1)
    };

    let api = TestApi::new(Database::open(&db_path).unwrap());
    assert_eq!(api.members(owner).await, vec![r1]);

    let stored = api.services.stores.resources.get(owner).unwrap();
    assert_eq!(stored.meta.version, 1);
    assert_eq!(stored.representations.len(), 1);
}
