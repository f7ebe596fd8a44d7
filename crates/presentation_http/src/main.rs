//! LetterDesk HTTP Server
//!
//! Serves the SQLite letter store to clients running in `http` repository mode.

use std::time::Duration;

use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use infrastructure::{
    AppConfig, AsyncDatabase, AsyncDatabaseConfig, RepositoryMode, SqliteLetterRepository,
    TelemetryAppConfig, adapters::wire::IDEMPOTENCY_KEY_HEADER, init_logging,
};
use presentation_http::{AppState, routes, set_expose_internal_errors};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = AppConfig::load();
    let telemetry = loaded
        .as_ref()
        .map_or_else(|_| TelemetryAppConfig::default(), |c| c.telemetry.clone());
    init_logging(&telemetry)?;

    info!("LetterDesk server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = loaded.unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    set_expose_internal_errors(!config.is_production());

    if config.repository.mode == RepositoryMode::Http {
        warn!("repository.mode = \"http\" is ignored by the server; serving the SQLite store");
    }

    info!(
        host = %config.server.host,
        port = %config.server.port,
        store = %config.repository.sqlite_path,
        environment = %config.environment,
        "Configuration loaded"
    );

    let db = AsyncDatabase::open(
        &AsyncDatabaseConfig::file(&config.repository.sqlite_path)
            .with_max_connections(config.repository.max_connections),
    )
    .await?;
    let state = AppState::new(SqliteLetterRepository::new(db.pool().clone()));

    let app = routes::create_router(state)
        .layer(RequestBodyLimitLayer::new(
            config.server.max_body_size_json_bytes,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs.unwrap_or(30));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.server.cors_enabled {
        return CorsLayer::new();
    }
    if config.server.allowed_origins.is_empty() {
        // Development mode: allow all origins
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            CONTENT_TYPE,
            axum::http::HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
        ])
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }

    info!("Waiting up to {:?} for connections to close", timeout);
}
