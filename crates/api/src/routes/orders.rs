//! Order endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::{CustomerId, OrderId, ProductId};
use domain::{NewOrderItem, OrderView};
use serde::{Deserialize, Serialize};
use store::{OrderStatus, Store};

use crate::AppState;
use crate::error::ApiError;

pub fn router<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/orders", get(list::<S>).post(create::<S>))
        .route("/orders/{id}", get(get_one::<S>).patch(update::<S>))
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: uuid::Uuid,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: uuid::Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub customer_id: Option<uuid::Uuid>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: uuid::Uuid,
    pub customer_id: uuid::Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: uuid::Uuid,
    pub product_id: uuid::Uuid,
    pub quantity: u32,
    /// Price frozen at order creation; catalog changes never touch it.
    pub unit_price_cents: i64,
}

impl From<OrderView> for OrderResponse {
    fn from(view: OrderView) -> Self {
        OrderResponse {
            id: view.order.id.as_uuid(),
            customer_id: view.order.customer_id.as_uuid(),
            status: view.order.status,
            total_cents: view.total_price.cents(),
            created_at: view.order.created_at,
            updated_at: view.order.updated_at,
            items: view
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    id: item.id.as_uuid(),
                    product_id: item.product_id.as_uuid(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — snapshots current prices into the order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let items = req
        .items
        .into_iter()
        .map(|item| NewOrderItem {
            product_id: ProductId::from_uuid(item.product_id),
            quantity: item.quantity,
        })
        .collect();
    let view = state
        .orders
        .create_order(CustomerId::from_uuid(req.customer_id), items)
        .await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// GET /orders — optionally filtered by customer.
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let views = state
        .orders
        .list_orders(query.customer_id.map(CustomerId::from_uuid))
        .await?;
    Ok(Json(views.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id
pub async fn get_one<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let view = state.orders.get_order(OrderId::from_uuid(id)).await?;
    Ok(Json(view.into()))
}

/// PATCH /orders/:id — status update; any transition is accepted.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown order status: {}", req.status)))?;
    let view = state
        .orders
        .set_status(OrderId::from_uuid(id), status)
        .await?;
    Ok(Json(view.into()))
}
