//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p storage --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use domain::{Money, NewOrder, OrderItem, OrderStatus, Product, ProductId, UserId};
use sqlx::PgPool;
use storage::{
    OrderQuery, OrderRepository, PostgresOrderRepository, PostgresProductStore,
    PostgresUserDirectory, ProductStore, ProductStoreExt, StockUpdate, StoreError, UserDirectory,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            for migration in [
                include_str!("../../../migrations/001_create_products_table.sql"),
                include_str!("../../../migrations/002_create_orders_table.sql"),
                include_str!("../../../migrations/003_create_users_table.sql"),
            ] {
                sqlx::raw_sql(migration).execute(&temp_pool).await.unwrap();
            }
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh pool with truncated tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE products, orders, users")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn widget(stock: u32) -> Product {
    Product::new("SKU-001", "Widget", Money::from_cents(1000), stock)
}

fn new_order(user: UserId, price_cents: i64, quantity: u32) -> NewOrder {
    NewOrder::new(
        user,
        vec![OrderItem::new(
            "SKU-001",
            "Widget",
            Money::from_cents(price_cents),
            quantity,
        )],
    )
}

#[tokio::test]
async fn conditional_decrement_respects_stock() {
    let store = PostgresProductStore::new(get_test_pool().await);
    store.upsert(&widget(3)).await.unwrap();
    let id = ProductId::new("SKU-001");

    let first = store.decrement_if_available(&id, 2).await.unwrap();
    assert_eq!(first, StockUpdate::Applied { remaining: 1 });

    let second = store.decrement_if_available(&id, 2).await.unwrap();
    assert_eq!(second, StockUpdate::Rejected);
    assert_eq!(store.available_quantity(&id).await.unwrap(), Some(1));
}

#[tokio::test]
async fn concurrent_decrements_take_last_unit_once() {
    let store = PostgresProductStore::new(get_test_pool().await);
    store.upsert(&widget(1)).await.unwrap();
    let id = ProductId::new("SKU-001");

    let (a, b) = tokio::join!(
        store.decrement_if_available(&id, 1),
        store.decrement_if_available(&id, 1)
    );
    let applied = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|u| u.is_applied())
        .count();

    assert_eq!(applied, 1);
    assert_eq!(store.available_quantity(&id).await.unwrap(), Some(0));
}

#[tokio::test]
async fn restock_restores_units() {
    let store = PostgresProductStore::new(get_test_pool().await);
    store.upsert(&widget(0)).await.unwrap();
    let id = ProductId::new("SKU-001");

    store.restock(&id, 4).await.unwrap();
    assert_eq!(store.available_quantity(&id).await.unwrap(), Some(4));

    let missing = store.restock(&ProductId::new("missing"), 1).await;
    assert!(matches!(missing, Err(StoreError::ProductNotFound(_))));
}

#[tokio::test]
async fn insert_and_get_order() {
    let repo = PostgresOrderRepository::new(get_test_pool().await);
    let user = UserId::new();

    let stored = repo.insert(new_order(user, 1000, 2)).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.grand_total.cents(), 2000);
    assert_eq!(stored.created_at, stored.updated_at);

    let loaded = repo.get(stored.id).await.unwrap().unwrap();
    assert_eq!(loaded, stored);
}

#[tokio::test]
async fn list_orders_scoped_paginated_and_filtered() {
    let repo = PostgresOrderRepository::new(get_test_pool().await);
    let user = UserId::new();
    let other = UserId::new();

    for price in [500, 1000, 1050, 4000] {
        repo.insert(new_order(user, price, 1)).await.unwrap();
    }
    repo.insert(new_order(other, 1000, 1)).await.unwrap();

    let page = repo
        .list_for_user(user, &OrderQuery::new().limit(3))
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total_pages(), 2);
    assert!(page.items.iter().all(|o| o.created_by == user));
    assert!(
        page.items
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at)
    );

    let filtered = repo
        .list_for_user(user, &OrderQuery::new().search("grandTotal:10"))
        .await
        .unwrap();
    assert_eq!(filtered.total, 2);

    let by_status = repo
        .list_for_user(user, &OrderQuery::new().search("status:PEND"))
        .await
        .unwrap();
    assert_eq!(by_status.total, 4);
}

#[tokio::test]
async fn user_directory_reads_contacts() {
    let pool = get_test_pool().await;
    let user = UserId::new();
    sqlx::query("INSERT INTO users (id, full_name, email) VALUES ($1, $2, $3)")
        .bind(user.as_uuid())
        .bind("Ada Lovelace")
        .bind("ada@example.com")
        .execute(&pool)
        .await
        .unwrap();

    let directory = PostgresUserDirectory::new(pool);
    let contact = directory.find_contact(user).await.unwrap().unwrap();
    assert_eq!(contact.full_name, "Ada Lovelace");
    assert!(directory.find_contact(UserId::new()).await.unwrap().is_none());
}
