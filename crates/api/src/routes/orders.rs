//! Order placement and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{LineItem, Money, Order, OrderItem, OrderRequest, OrderStatus, ValidationError};
use ordering::Notifier;
use serde::{Deserialize, Serialize};
use storage::{OrderQuery, OrderRepository, Page, ProductStore, UserDirectory};

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Ignored for pricing.
    #[serde(default)]
    pub price: Option<f64>,
    pub quantity: i64,
}

impl CreateOrderRequest {
    /// Checks the body against the authenticated caller and validates every
    /// line item.
    pub fn into_order_request(self, caller: UserId) -> Result<OrderRequest, ValidationError> {
        if let Some(raw) = self.created_by.as_deref() {
            let created_by = UserId::parse(raw.trim())
                .map_err(|_| ValidationError::Malformed("createdBy is not a valid UUID".into()))?;
            if created_by != caller {
                return Err(ValidationError::CreatorMismatch);
            }
        }

        let items = self
            .order_items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                LineItem::parse(index, item.product_id, item.quantity)
                    .map(|line| line.with_claimed_price(item.price.and_then(Money::from_decimal)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        OrderRequest::new(caller, items)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

impl ListOrdersParams {
    pub fn to_query(&self) -> OrderQuery {
        let mut query = OrderQuery::new();
        if let Some(page) = self.page {
            query = query.page(page.clamp(1, u32::MAX as i64) as u32);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit.clamp(1, u32::MAX as i64) as u32);
        }
        if let Some(search) = &self.search {
            query = query.search(search);
        }
        query
    }
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub order_items: Vec<OrderItemResponse>,
    pub grand_total: f64,
    pub created_by: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub data: Vec<OrderResponse>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            price: item.unit_price.to_decimal(),
            quantity: item.quantity,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_items: order.items.iter().map(OrderItemResponse::from).collect(),
            grand_total: order.grand_total.to_decimal(),
            created_by: order.created_by.to_string(),
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<Page<Order>> for OrderListResponse {
    fn from(page: Page<Order>) -> Self {
        let total_pages = page.total_pages();
        Self {
            data: page.items.into_iter().map(OrderResponse::from).collect(),
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages,
        }
    }
}

// -- Handlers --

/// POST /orders: place an order for the authenticated caller.
#[tracing::instrument(skip(state, payload), fields(user_id = %caller.0))]
pub async fn create<P, R, U, N>(
    State(state): State<Arc<AppState<P, R, U, N>>>,
    caller: CallerIdentity,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    P: ProductStore + Clone + 'static,
    R: OrderRepository + Clone + 'static,
    U: UserDirectory + Clone + 'static,
    N: Notifier + Clone + 'static,
{
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = body.into_order_request(caller.0)?;

    let order = state.placement.place(request).await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders: list the caller's orders, newest first.
#[tracing::instrument(skip(state, params), fields(user_id = %caller.0))]
pub async fn list<P, R, U, N>(
    State(state): State<Arc<AppState<P, R, U, N>>>,
    caller: CallerIdentity,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<OrderListResponse>, ApiError>
where
    P: ProductStore + Clone + 'static,
    R: OrderRepository + Clone + 'static,
    U: UserDirectory + Clone + 'static,
    N: Notifier + Clone + 'static,
{
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = state
        .placement
        .list_orders(caller.0, &params.to_query())
        .await?;

    Ok(Json(page.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_request_parses_camel_case() {
        let caller = UserId::new();
        let request = body(serde_json::json!({
            "orderItems": [{ "productId": "P", "name": "Widget", "price": 0.01, "quantity": 2 }],
            "createdBy": caller.to_string(),
        }))
        .into_order_request(caller)
        .unwrap();

        assert_eq!(request.created_by, caller);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.items[0].claimed_price, Some(Money::from_cents(1)));
    }

    #[test]
    fn test_creator_mismatch_rejected() {
        let err = body(serde_json::json!({
            "orderItems": [{ "productId": "P", "quantity": 1 }],
            "createdBy": UserId::new().to_string(),
        }))
        .into_order_request(UserId::new())
        .unwrap_err();

        assert_eq!(err, ValidationError::CreatorMismatch);
    }

    #[test]
    fn test_missing_items_rejected() {
        let err = body(serde_json::json!({}))
            .into_order_request(UserId::new())
            .unwrap_err();
        assert_eq!(err, ValidationError::NoItems);
    }

    #[test]
    fn test_list_params_clamp() {
        let query = ListOrdersParams {
            page: Some(-3),
            limit: Some(1000),
            search: None,
        }
        .to_query();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 100);
    }
}
