//! Opaque external identifiers
//!
//! Callers refer to resources by an [`EndpointId`], the path of the resource
//! under the API base path: `/api/v2/representations/<uuid>`. Absolute URLs
//! with the same path are accepted on input. Ids are resolved to
//! `(kind, uuid)` before they reach a linker.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::RelationError;
use crate::model::ResourceKind;

/// Caller-visible identifier of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal form of an [`EndpointId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedId {
    pub kind: ResourceKind,
    pub id: Uuid,
}

/// Maps external identifiers to internal keys and back
#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    base_path: String,
}

impl IdentifierResolver {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// External identifier for a resource
    pub fn endpoint_id(&self, kind: ResourceKind, id: Uuid) -> EndpointId {
        EndpointId(format!("{}/{}/{}", self.base_path, kind.segment(), id))
    }

    /// Resolve an external identifier of any kind
    pub fn resolve(&self, endpoint: &EndpointId) -> Result<ResolvedId, RelationError> {
        let raw = endpoint.as_str().trim();
        let path = if raw.contains("://") {
            let url = Url::parse(raw).map_err(|e| invalid(raw, &e.to_string()))?;
            url.path().to_string()
        } else {
            raw.to_string()
        };

        let rest = path
            .strip_prefix(&self.base_path)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| invalid(raw, &format!("expected path under '{}/'", self.base_path)))?;

        let mut segments = rest.trim_end_matches('/').split('/');
        let (kind, id) = match (segments.next(), segments.next(), segments.next()) {
            (Some(kind), Some(id), None) => (kind, id),
            _ => return Err(invalid(raw, "expected '<kind>/<uuid>'")),
        };

        let kind = ResourceKind::from_segment(kind)
            .ok_or_else(|| invalid(raw, &format!("unknown resource kind '{}'", kind)))?;
        let id = Uuid::parse_str(id).map_err(|e| invalid(raw, &e.to_string()))?;

        Ok(ResolvedId { kind, id })
    }

    /// Resolve an identifier that must refer to `expected`
    pub fn resolve_as(&self, endpoint: &EndpointId, expected: ResourceKind) -> Result<Uuid, RelationError> {
        let resolved = self.resolve(endpoint)?;
        if resolved.kind != expected {
            return Err(RelationError::InvalidInput(format!(
                "'{}' refers to {}, expected {}",
                endpoint, resolved.kind, expected
            )));
        }
        Ok(resolved.id)
    }

    /// Resolve a caller-supplied list into a set; order and duplicates are dropped
    pub fn resolve_all(
        &self,
        endpoints: &[EndpointId],
        expected: ResourceKind,
    ) -> Result<BTreeSet<Uuid>, RelationError> {
        endpoints
            .iter()
            .map(|endpoint| self.resolve_as(endpoint, expected))
            .collect()
    }
}

fn invalid(raw: &str, reason: &str) -> RelationError {
    RelationError::InvalidInput(format!("Malformed identifier '{}': {}", raw, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IdentifierResolver {
        IdentifierResolver::new("/api/v2")
    }

    #[test]
    fn test_endpoint_id_resolves_back() {
        let id = Uuid::new_v4();
        let endpoint = resolver().endpoint_id(ResourceKind::Representation, id);

        assert_eq!(endpoint.as_str(), format!("/api/v2/representations/{}", id));
        assert_eq!(
            resolver().resolve(&endpoint).unwrap(),
            ResolvedId { kind: ResourceKind::Representation, id }
        );
    }

    #[test]
    fn test_accepts_absolute_url_and_trailing_slash() {
        let id = Uuid::new_v4();
        let endpoint = EndpointId::new(format!("https://connector.example:8080/api/v2/artifacts/{}/", id));

        let resolved = resolver().resolve(&endpoint).unwrap();
        assert_eq!(resolved.kind, ResourceKind::Artifact);
        assert_eq!(resolved.id, id);
    }

    #[test]
    fn test_rejects_malformed_identifiers() {
        let id = Uuid::new_v4();
        let bad = [
            "".to_string(),
            "not an id".to_string(),
            format!("/api/v1/artifacts/{}", id),
            format!("/api/v2/widgets/{}", id),
            "/api/v2/artifacts/not-a-uuid".to_string(),
            format!("/api/v2/artifacts/{}/extra", id),
            format!("/api/v2artifacts/{}", id),
        ];

        for raw in bad {
            let result = resolver().resolve(&EndpointId::new(raw.clone()));
            assert!(
                matches!(result, Err(RelationError::InvalidInput(_))),
                "accepted {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_resolve_as_checks_kind() {
        let endpoint = resolver().endpoint_id(ResourceKind::Contract, Uuid::new_v4());
        let result = resolver().resolve_as(&endpoint, ResourceKind::Representation);
        assert!(matches!(result, Err(RelationError::InvalidInput(_))));
    }

    #[test]
    fn test_resolve_all_deduplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let r = resolver();
        let endpoints = vec![
            r.endpoint_id(ResourceKind::Artifact, b),
            r.endpoint_id(ResourceKind::Artifact, a),
            r.endpoint_id(ResourceKind::Artifact, b),
        ];

        let ids = r.resolve_all(&endpoints, ResourceKind::Artifact).unwrap();
        assert_eq!(ids, [a, b].into_iter().collect());
    }

    #[test]
    fn test_root_base_path() {
        let r = IdentifierResolver::new("/");
        let id = Uuid::new_v4();
        let endpoint = r.endpoint_id(ResourceKind::Catalog, id);

        assert_eq!(endpoint.as_str(), format!("/catalogs/{}", id));
        assert_eq!(r.resolve(&endpoint).unwrap().id, id);
    }
}
