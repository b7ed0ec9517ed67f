//! Connector Relations - relation membership service for dataspace connector resources
//!
//! Owners (catalogs, offered resources, representations, contracts) keep
//! set-valued relations to child resources. This crate reads and changes
//! those memberships through four operations - get, add, replace and remove -
//! with each call loading the owner once and persisting it at most once.
//!
//! ## Architecture
//!
//! - **Identifier resolver**: maps caller-visible ids (`/api/v2/representations/<uuid>`) to internal keys
//! - **Aggregate stores**: load, existence check and atomic save per resource kind (SQLite)
//! - **Relation linker**: generic get/add/replace/remove over one owner-side mapping
//! - **Relation endpoints**: HTTP verbs mapped onto linker calls
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/connector-relations/
//! ├── relations.db           # SQLite: resources + resource_links
//! └── config.toml            # Configuration
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod identifier;
pub mod model;
pub mod seed;
pub mod services;

// Re-exports
pub use config::Config;
pub use db::Database;
pub use error::RelationError;
pub use http::HttpServer;
pub use identifier::{EndpointId, IdentifierResolver};
pub use services::{LinkerPolicy, RelationLinker, Services};
