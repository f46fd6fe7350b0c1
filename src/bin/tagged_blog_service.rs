//! Blog Service Binary
//!
//! Runs the blog over PostgreSQL with:
//! - Structured JSON logging
//! - Access log line per request, keyed by `X-Request-Id`
//! - Optional per-request deadline
//! - Graceful shutdown handling
//!
//! ## Configuration
//!
//! Environment variables (see `BlogConfig` and `PostgresConfig` for the rest):
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `BLOG_LOGIN`, `BLOG_PASSWORD`: admin credentials (required)
//! - `BLOG_SECRET_KEY`: session signing secret (required in production)
//! - `BLOG_CONFIG`: optional JSON config file
//! - `PORT`, `HOST`: listen address (default: 0.0.0.0:8001)
//! - `REQUEST_TIMEOUT_SECS`: request deadline (default: none)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... BLOG_LOGIN=admin BLOG_PASSWORD=... BLOG_SECRET_KEY=... \
//!     cargo run --bin tagged_blog_service --features service
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tagged_blog::service::{create_router, request_logging_middleware, ServiceState};
use tagged_blog::{BlogConfig, PostgresDocumentStore};

/// JSON logs unless `LOG_FORMAT=pretty`.
fn init_tracing() {
    let pretty = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "pretty");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tagged_blog=info,tagged_blog_service=info,tower_http=info,sqlx=warn".into());

    let registry = tracing_subscriber::registry().with(filter);
    if pretty {
        registry.with(fmt::layer().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().json().with_current_span(true).flatten_event(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(version = version, build_sha = build_sha, "Starting Blog Service");

    let config = BlogConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;
    info!(
        title = %config.title,
        page_size = config.page_size.get(),
        token_ttl_secs = config.token_ttl.as_secs(),
        "Configuration loaded"
    );

    info!("Connecting to PostgreSQL...");
    let connect_start = Instant::now();

    let store = match tokio::time::timeout(Duration::from_secs(30), PostgresDocumentStore::from_env()).await {
        Ok(Ok(store)) => store,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            return Err(e.into());
        }
        Err(_) => {
            tracing::error!("PostgreSQL connection timeout after 30s");
            return Err("Database connection timeout".into());
        }
    };

    store.ensure_schema().await?;
    let pool = store.pool_stats();
    info!(
        latency_ms = connect_start.elapsed().as_millis() as u64,
        pool_size = pool.size,
        pool_idle = pool.idle,
        pool_max = pool.max,
        "PostgreSQL connection established, schema ready"
    );

    let state = ServiceState::from_config(store, &config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = create_router(state);
    if let Some(timeout) = config.request_timeout {
        info!(timeout_secs = timeout.as_secs(), "Request deadline enabled");
        app = app.layer(TimeoutLayer::new(timeout));
    }
    let app = app
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!(address = %addr, version = version, "Blog Service listening");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
            _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        }
    };

    info!("Ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Blog Service shutdown complete");

    Ok(())
}
