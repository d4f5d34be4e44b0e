//! User Service
//!
//! Entry point for account and session management.

use common::secret::ExposeSecret;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_service::config::Config;
use user_service::crypto::TokenIssuer;
use user_service::repositories::{PgUserRepository, RedisSessionRegistry, UserRepository};
use user_service::routes::{self, AppState};
use user_service::services::{AccountService, AuthService, CredentialStore, SessionValidator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting User Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        token_ttl_secs = config.token_ttl.as_secs(),
        bcrypt_cost = config.bcrypt_cost,
        "Configuration loaded successfully"
    );

    // Fail fast on a bad key rather than on the first login.
    let issuer = Arc::new(
        TokenIssuer::new(
            config.signing_key.expose_secret(),
            config.token_ttl,
            config.jwt_clock_skew,
        )
        .map_err(|e| {
            error!("Failed to load signing key: {}", e);
            e
        })?,
    );

    info!("Connecting to database...");
    let db_url_with_timeout = add_query_timeout(config.database_url.expose_secret(), 5);
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_url_with_timeout)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;
    info!("Database connection established");

    info!("Connecting to session registry...");
    let registry = Arc::new(
        RedisSessionRegistry::connect(config.redis_url.expose_secret(), config.redis_op_timeout)
            .await
            .map_err(|e| {
                error!("Failed to connect to Redis: {}", e);
                e
            })?,
    );
    info!("Session registry connection established");

    let metrics_handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        error!("Failed to install Prometheus recorder: {}", e);
        e
    })?;

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db_pool));
    let credentials = Arc::new(CredentialStore::new(users.clone(), config.bcrypt_cost)?);

    let state = Arc::new(AppState {
        auth: AuthService::new(credentials.clone(), issuer.clone(), registry.clone(), config.redis_op_timeout),
        accounts: AccountService::new(users, registry.clone(), config.redis_op_timeout),
        credentials,
        sessions: SessionValidator::new(issuer, registry, config.redis_op_timeout),
        max_request_timeout: config.max_request_timeout,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("User Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("User Service shutdown complete");

    Ok(())
}

/// Listens for SIGINT/SIGTERM, then waits out the drain period.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("US_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    }
}

/// Adds statement_timeout to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}
