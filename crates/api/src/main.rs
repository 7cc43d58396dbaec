//! API server entry point.

use std::sync::Arc;

use api::{AppState, Config, LogFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use ordering::Notifier;
use sqlx::postgres::PgPoolOptions;
use storage::{InMemoryProductStore, OrderRepository, ProductStore, UserDirectory};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn load_catalog(config: &Config) -> InMemoryProductStore {
    let Some(path) = &config.catalog_seed else {
        tracing::warn!("CATALOG_SEED not set, starting with an empty catalog");
        return InMemoryProductStore::new();
    };

    let seed = tokio::fs::read_to_string(path)
        .await
        .expect("failed to read catalog seed");
    let store = InMemoryProductStore::from_json(&seed)
        .await
        .expect("invalid catalog seed");
    tracing::info!(path = %path.display(), "catalog seeded");
    store
}

async fn serve<P, R, U, N>(
    config: &Config,
    state: Arc<AppState<P, R, U, N>>,
    metrics_handle: PrometheusHandle,
) where
    P: ProductStore + Clone + 'static,
    R: OrderRepository + Clone + 'static,
    U: UserDirectory + Clone + 'static,
    N: Notifier + Clone + 'static,
{
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build stores and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to database");
            storage::run_migrations(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stores");

            let state = api::create_postgres_state(pool, &config);
            serve(&config, state, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            let products = load_catalog(&config).await;
            let state = api::create_default_state(products, &config);
            serve(&config, state, metrics_handle).await;
        }
    }
}
