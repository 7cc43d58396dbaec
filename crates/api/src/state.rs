//! Shared application state.

use std::sync::Arc;

use ordering::{LogNotifier, Notifier, OrderPlacement};
use sqlx::PgPool;
use storage::{
    InMemoryOrderRepository, InMemoryProductStore, InMemoryUserDirectory, OrderRepository,
    PostgresOrderRepository, PostgresProductStore, PostgresUserDirectory, ProductStore,
    UserDirectory,
};

use crate::config::Config;

/// State accessible from all handlers.
pub struct AppState<P, R, U, N>
where
    P: ProductStore,
    R: OrderRepository,
    U: UserDirectory,
    N: Notifier,
{
    pub placement: OrderPlacement<P, R, U, N>,
}

impl<P, R, U, N> AppState<P, R, U, N>
where
    P: ProductStore,
    R: OrderRepository,
    U: UserDirectory,
    N: Notifier,
{
    pub fn new(placement: OrderPlacement<P, R, U, N>) -> Self {
        Self { placement }
    }
}

pub type InMemoryAppState =
    AppState<InMemoryProductStore, InMemoryOrderRepository, InMemoryUserDirectory, LogNotifier>;

pub type PostgresAppState =
    AppState<PostgresProductStore, PostgresOrderRepository, PostgresUserDirectory, LogNotifier>;

/// Builds state backed by in-memory stores around the given catalog.
pub fn create_default_state(products: InMemoryProductStore, config: &Config) -> Arc<InMemoryAppState> {
    Arc::new(AppState::new(OrderPlacement::new(
        products,
        InMemoryOrderRepository::new(),
        InMemoryUserDirectory::new(),
        LogNotifier,
        config.placement_config(),
        config.notification_config(),
    )))
}

/// Builds state backed by PostgreSQL. Migrations must already have run.
pub fn create_postgres_state(pool: PgPool, config: &Config) -> Arc<PostgresAppState> {
    Arc::new(AppState::new(OrderPlacement::new(
        PostgresProductStore::new(pool.clone()),
        PostgresOrderRepository::new(pool.clone()),
        PostgresUserDirectory::new(pool),
        LogNotifier,
        config.placement_config(),
        config.notification_config(),
    )))
}
