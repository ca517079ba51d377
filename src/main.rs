//! Logistics intake server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use aws_config::{BehaviorVersion, Region};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use logistics_intake_lib::api;
use logistics_intake_lib::auth::{MemorySessionStore, session_key, session_middleware};
use logistics_intake_lib::config::Config;
use logistics_intake_lib::db::{DynamoMetadataStore, MetadataStore};
use logistics_intake_lib::middleware::RequestLogger;
use logistics_intake_lib::services::{
    BlobStore, IdentityGateway, OidcClient, RoleMapping, S3Storage, UnavailableGateway,
};
use logistics_intake_lib::state::AppState;

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    // Simple check - just verify we can load config
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(env_filter)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - INTAKE_SESSION_SECRET must be at least 32 bytes");
            error!("  - In production, OIDC_* and INTAKE_SESSION_SECRET must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Logistics Intake Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    // AWS clients share one configuration (credentials from the default chain)
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;

    let metadata: Arc<dyn MetadataStore> =
        Arc::new(DynamoMetadataStore::new(&sdk_config, &config.metadata));

    let blobs: Arc<dyn BlobStore> = match S3Storage::new(&sdk_config, &config.s3).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!("Failed to initialize S3 storage: {}", e);
            std::process::exit(1);
        }
    };

    // Without a discovered provider the server still serves pages; /login answers 500
    let identity: Arc<dyn IdentityGateway> = match OidcClient::discover(&config.oidc).await {
        Ok(client) => {
            info!("Login via OIDC issuer {}", client.metadata().issuer);
            Arc::new(client)
        }
        Err(e) => {
            error!("OIDC discovery failed, login disabled: {}", e);
            Arc::new(UnavailableGateway)
        }
    };

    let roles = RoleMapping {
        groups_claim: config.oidc.groups_claim.clone(),
        admin_group: config.oidc.admin_group.clone(),
    };

    let state = AppState::new(identity, metadata, blobs, roles, config.max_upload_size);

    info!(
        "Upload limit: {}MB per file",
        config.max_upload_size / 1024 / 1024
    );

    let bind_address = config.bind_address();
    let secure_cookies = config.secure_cookies();
    let key = session_key(&config.session_secret);
    // One store shared by every worker
    let sessions = MemorySessionStore::new();

    let worker_count = if config.environment.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(session_middleware(sessions.clone(), key.clone(), secure_cookies))
            .wrap(RequestLogger)
            .app_data(web::Data::new(state.clone()))
            .configure(api::configure_routes)
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
