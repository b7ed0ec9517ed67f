//! HTTP API for relation membership
//!
//! ## Relation API
//! - `GET    {base}/{ownerType}/{ownerId}/{relation}` - List linked children
//! - `POST   {base}/{ownerType}/{ownerId}/{relation}` - Link children, returns the new list
//! - `PUT    {base}/{ownerType}/{ownerId}/{relation}` - Replace the linked children
//! - `DELETE {base}/{ownerType}/{ownerId}/{relation}` - Unlink children
//!
//! Request and response bodies are JSON arrays of child identifiers.
//!
//! ## Example Usage
//!
//! ```bash
//! # Link two representations to a resource
//! curl -X POST -H "Content-Type: application/json" \
//!      -d '["/api/v2/representations/7f1c…", "/api/v2/representations/93ab…"]' \
//!      http://localhost:8080/api/v2/resources/5d2e…/representations
//!
//! # List them
//! curl http://localhost:8080/api/v2/resources/5d2e…/representations
//! ```

use crate::error::RelationError;
use crate::identifier::EndpointId;
use crate::model::ResourceKind;
use crate::services::{endpoint, response, Services};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(services: Arc<Services>, bind_addr: SocketAddr) -> Self {
        Self {
            services,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), RelationError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .await
                {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let body = req.into_body().collect().await?.to_bytes();

        Ok(self.route(&method, &path, &body))
    }

    /// Route a request with a fully read body
    pub fn route(&self, method: &Method, path: &str, body: &[u8]) -> Response<Full<Bytes>> {
        debug!(method = %method, path = %path, "Incoming request");

        if path == "/health" {
            return match *method {
                Method::GET => self.handle_health(),
                _ => response::method_not_allowed(),
            };
        }

        let base = self.services.resolver.base_path();
        let segments = path
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.trim_end_matches('/').split('/').collect::<Vec<_>>());

        match segments.as_deref() {
            Some([owner_type, owner_id, relation]) => {
                let Some(owner_kind) = ResourceKind::from_segment(owner_type) else {
                    return response::not_found(&format!("Unknown resource type '{}'", owner_type));
                };
                let Some(relation_endpoint) = self.services.relations.lookup(owner_kind, relation) else {
                    return response::not_found(&format!(
                        "Resource type '{}' has no relation '{}'",
                        owner_type, relation
                    ));
                };

                let owner = EndpointId::new(format!("{}/{}/{}", base, owner_type, owner_id));
                endpoint::handle(relation_endpoint.as_ref(), method, &owner, body)
            }
            _ => response::not_found("Not found"),
        }
    }

    /// Health check endpoint
    fn handle_health(&self) -> Response<Full<Bytes>> {
        match self.services.db.stats() {
            Ok(stats) => response::ok(&serde_json::json!({
                "status": "ok",
                "resources": stats.resource_count,
                "links": stats.link_count,
            })),
            Err(e) => response::error_response(e),
        }
    }
}
