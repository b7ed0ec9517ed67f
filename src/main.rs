//! Connector Relations Daemon
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! connector-relations
//!
//! # Start with custom config
//! connector-relations --config /path/to/config.toml
//!
//! # Custom port and storage directory, seeding resources on start
//! connector-relations --http-port 8081 --storage-dir /data/relations --seed resources.json
//! ```
//!
//! ## HTTP API
//!
//! - `GET /health` - Health check
//! - `GET|POST|PUT|DELETE /api/v2/{ownerType}/{ownerId}/{relation}` - Relation membership

use clap::Parser;
use connector_relations::seed::{apply_seed, load_seed};
use connector_relations::services::events::spawn_logging_listener;
use connector_relations::{Config, Database, HttpServer, IdentifierResolver, LinkerPolicy, Services};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "connector-relations")]
#[command(about = "Relation membership API for dataspace connector resources")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "CONNECTOR_RELATIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "CONNECTOR_RELATIONS_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "CONNECTOR_RELATIONS_HTTP_PORT")]
    http_port: Option<u16>,

    /// JSON file with resources to create on startup
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Require children to exist when removing them from a relation
    #[arg(long)]
    strict_remove: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("connector_relations=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(seed) = args.seed {
        config.seed_file = Some(seed);
    }
    if args.strict_remove {
        config.require_existing_child_on_remove = true;
    }
    config.validate()?;

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        strict_remove = config.require_existing_child_on_remove,
        "Starting connector-relations"
    );

    tokio::fs::create_dir_all(&config.storage_dir).await?;

    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let db = Arc::new(Database::open(&config.database_path())?);
    let services = Arc::new(Services::new(
        db.clone(),
        IdentifierResolver::new(&config.api_base_path),
        LinkerPolicy {
            require_existing_child_on_remove: config.require_existing_child_on_remove,
        },
    ));

    if let Some(seed_path) = &config.seed_file {
        let seed = load_seed(seed_path)?;
        apply_seed(&services.stores, &seed)?;
    }

    let listener = spawn_logging_listener(services.events.clone());

    let http_addr: SocketAddr = format!("{}:{}", config.bind_address, config.http_port).parse()?;
    let http_server = Arc::new(HttpServer::new(services.clone(), http_addr));

    info!("HTTP API available at http://{}", http_addr);
    for (owner, relation, child) in services.relations.routes() {
        info!(
            "  {}/{}/{{id}}/{:<16} -> {}",
            services.resolver.base_path(),
            owner,
            relation,
            child
        );
    }
    info!("Press Ctrl+C to stop.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    listener.abort();

    if let Ok(stats) = db.stats() {
        info!(
            resources = stats.resource_count,
            links = stats.link_count,
            "Final storage stats"
        );
    }

    Ok(())
}
