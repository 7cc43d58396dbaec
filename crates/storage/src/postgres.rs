use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{Money, NewOrder, Order, OrderItem, OrderStatus, Product};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderFilter, OrderQuery, Page, Result, StoreError,
    store::{OrderRepository, ProductStore, StockUpdate, UserContact, UserDirectory},
};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed product store.
///
/// The conditional decrement is a single `UPDATE ... WHERE available_quantity >= $2`,
/// so the row lock taken by that statement is the only synchronisation needed.
#[derive(Clone)]
pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    /// Creates a new PostgreSQL product store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts or replaces a product. Catalog management proper lives
    /// elsewhere; this exists for seeding and tests.
    pub async fn upsert(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, available_quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                available_quantity = EXCLUDED.available_quantity,
                updated_at = NOW()
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(to_db_quantity(product.available_quantity)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let quantity: i32 = row.try_get("available_quantity")?;
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            available_quantity: from_db_quantity(quantity)?,
        })
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    #[tracing::instrument(skip(self, id), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, available_quantity FROM products WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    #[tracing::instrument(skip(self, id), fields(product_id = %id))]
    async fn decrement_if_available(&self, id: &ProductId, quantity: u32) -> Result<StockUpdate> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET available_quantity = available_quantity - $2, updated_at = NOW()
            WHERE id = $1 AND available_quantity >= $2
            RETURNING available_quantity
            "#,
        )
        .bind(id.as_str())
        .bind(to_db_quantity(quantity)?)
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(remaining) => Ok(StockUpdate::Applied {
                remaining: from_db_quantity(remaining)?,
            }),
            None => {
                metrics::counter!("inventory_decrement_rejections_total").increment(1);
                Ok(StockUpdate::Rejected)
            }
        }
    }

    #[tracing::instrument(skip(self, id), fields(product_id = %id))]
    async fn restock(&self, id: &ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET available_quantity = available_quantity + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(to_db_quantity(quantity)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id.clone()));
        }
        Ok(())
    }
}

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

/// A bind value for dynamically built listing queries.
enum Bind {
    Uuid(Uuid),
    Text(String),
    Int(i64),
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Builds the `WHERE` clause shared by the page and count queries.
    fn where_clause(user: UserId, query: &OrderQuery) -> (String, Vec<Bind>) {
        let mut binds = vec![Bind::Uuid(user.as_uuid())];
        let mut sql = String::from(" WHERE created_by = $1");

        if !query.filters.is_empty() {
            let mut clauses = Vec::with_capacity(query.filters.len());
            for filter in &query.filters {
                match filter {
                    OrderFilter::StatusContains(text) => {
                        binds.push(Bind::Text(format!("%{text}%")));
                        clauses.push(format!("status ILIKE ${}", binds.len()));
                    }
                    OrderFilter::GrandTotalAround(amount) => {
                        let (low, high) = OrderFilter::grand_total_bounds(*amount);
                        binds.push(Bind::Int(low));
                        let low_param = binds.len();
                        binds.push(Bind::Int(high));
                        clauses.push(format!(
                            "grand_total_cents BETWEEN ${low_param} AND ${}",
                            binds.len()
                        ));
                    }
                }
            }
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }

        (sql, binds)
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let items: serde_json::Value = row.try_get("items")?;
        let items: Vec<OrderItem> = serde_json::from_value(items)?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            items,
            grand_total: Money::from_cents(row.try_get("grand_total_cents")?),
            created_by: UserId::from_uuid(row.try_get::<Uuid, _>("created_by")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[tracing::instrument(skip(self, order), fields(created_by = %order.created_by))]
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let id = OrderId::new();
        let items = serde_json::to_value(&order.items)?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (id, created_by, status, grand_total_cents, items)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_by, status, grand_total_cents, items, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(order.created_by.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(order.grand_total.cents())
        .bind(items)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(row)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, created_by, status, grand_total_cents, items, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    #[tracing::instrument(skip(self, query), fields(page = query.page, limit = query.limit))]
    async fn list_for_user(&self, user: UserId, query: &OrderQuery) -> Result<Page<Order>> {
        let (where_sql, binds) = Self::where_clause(user, query);

        let count_sql = format!("SELECT COUNT(*) FROM orders{where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = match bind {
                Bind::Uuid(u) => count_query.bind(*u),
                Bind::Text(s) => count_query.bind(s.as_str()),
                Bind::Int(i) => count_query.bind(*i),
            };
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let page_sql = format!(
            "SELECT id, created_by, status, grand_total_cents, items, created_at, updated_at \
             FROM orders{where_sql} ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            binds.len() + 1,
            binds.len() + 2
        );
        let mut page_query = sqlx::query(&page_sql);
        for bind in &binds {
            page_query = match bind {
                Bind::Uuid(u) => page_query.bind(*u),
                Bind::Text(s) => page_query.bind(s.as_str()),
                Bind::Int(i) => page_query.bind(*i),
            };
        }
        let rows = page_query
            .bind(i64::from(query.limit))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page: query.page,
            limit: query.limit,
            total: total.max(0) as u64,
        })
    }
}

/// Reads contact data from the `users` table maintained by the account service.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[tracing::instrument(skip(self))]
    async fn find_contact(&self, user: UserId) -> Result<Option<UserContact>> {
        let row = sqlx::query("SELECT id, full_name, email FROM users WHERE id = $1")
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(UserContact {
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                full_name: row.try_get("full_name")?,
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }
}

fn to_db_quantity(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("quantity {quantity} exceeds column range")))
}

fn from_db_quantity(quantity: i32) -> Result<u32> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("negative stock level {quantity}")))
}
