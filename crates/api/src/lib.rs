//! HTTP API server for order placement.
//!
//! Exposes `POST /orders` and `GET /orders` on top of the ordering core,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use ordering::Notifier;
use storage::{OrderRepository, ProductStore, UserDirectory};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::{AppState, InMemoryAppState, PostgresAppState, create_default_state, create_postgres_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<P, R, U, N>(
    state: Arc<AppState<P, R, U, N>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    P: ProductStore + Clone + 'static,
    R: OrderRepository + Clone + 'static,
    U: UserDirectory + Clone + 'static,
    N: Notifier + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list::<P, R, U, N>).post(routes::orders::create::<P, R, U, N>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
