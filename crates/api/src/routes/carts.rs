//! Cart and cart-item endpoints.
//!
//! Cart identifiers are opaque server-generated UUIDs; possession of the id
//! is the only handle a client has on its cart.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::{CartId, CartItemId, ProductId};
use domain::{CartItemView, CartView};
use serde::{Deserialize, Serialize};
use store::{Cart, Store};

use crate::AppState;
use crate::error::ApiError;

pub fn router<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/carts", get(list::<S>).post(create::<S>))
        .route("/carts/{cart_id}", get(get_one::<S>).delete(delete::<S>))
        .route(
            "/carts/{cart_id}/items",
            get(list_items::<S>).post(add_item::<S>),
        )
        .route(
            "/carts/{cart_id}/items/{item_id}",
            get(get_item::<S>)
                .patch(update_item::<S>)
                .delete(remove_item::<S>),
        )
}

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: uuid::Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartSummaryResponse {
    pub id: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Cart> for CartSummaryResponse {
    fn from(c: Cart) -> Self {
        CartSummaryResponse {
            id: c.id.as_uuid(),
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: uuid::Uuid,
    pub product_id: uuid::Uuid,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub item_total_cents: i64,
}

impl From<CartItemView> for CartItemResponse {
    fn from(view: CartItemView) -> Self {
        CartItemResponse {
            id: view.id.as_uuid(),
            product_id: view.product.id.as_uuid(),
            product_name: view.product.name,
            unit_price_cents: view.product.price.cents(),
            quantity: view.quantity,
            item_total_cents: view.item_total.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct CartResponse {
    pub id: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub items: Vec<CartItemResponse>,
    pub total_price_cents: i64,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        CartResponse {
            id: view.id.as_uuid(),
            created_at: view.created_at,
            total_price_cents: view.total_price.cents(),
            items: view.items.into_iter().map(CartItemResponse::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /carts — allocates a fresh cart; the body is ignored.
#[tracing::instrument(skip(state))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<(StatusCode, Json<CartSummaryResponse>), ApiError> {
    let cart = state.carts.create_cart().await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// GET /carts
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CartSummaryResponse>>, ApiError> {
    let carts = state.carts.list_carts().await?;
    Ok(Json(carts.into_iter().map(CartSummaryResponse::from).collect()))
}

/// GET /carts/:cart_id — items with live totals.
pub async fn get_one<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<uuid::Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let view = state.carts.get_cart(CartId::from_uuid(cart_id)).await?;
    Ok(Json(view.into()))
}

/// DELETE /carts/:cart_id
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<uuid::Uuid>,
) -> Result<StatusCode, ApiError> {
    state.carts.delete_cart(CartId::from_uuid(cart_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /carts/:cart_id/items — duplicate products merge quantities.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<uuid::Uuid>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>), ApiError> {
    let item = state
        .carts
        .add_item(
            CartId::from_uuid(cart_id),
            ProductId::from_uuid(req.product_id),
            req.quantity,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// GET /carts/:cart_id/items
pub async fn list_items<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<uuid::Uuid>,
) -> Result<Json<Vec<CartItemResponse>>, ApiError> {
    let items = state.carts.list_items(CartId::from_uuid(cart_id)).await?;
    Ok(Json(items.into_iter().map(CartItemResponse::from).collect()))
}

/// GET /carts/:cart_id/items/:item_id
pub async fn get_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, item_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<Json<CartItemResponse>, ApiError> {
    let view = state
        .carts
        .get_item(CartId::from_uuid(cart_id), CartItemId::from_uuid(item_id))
        .await?;
    Ok(Json(view.into()))
}

/// PATCH /carts/:cart_id/items/:item_id — overwrites the quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, item_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartItemResponse>, ApiError> {
    let view = state
        .carts
        .update_item_quantity(
            CartId::from_uuid(cart_id),
            CartItemId::from_uuid(item_id),
            req.quantity,
        )
        .await?;
    Ok(Json(view.into()))
}

/// DELETE /carts/:cart_id/items/:item_id
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, item_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .carts
        .remove_item(CartId::from_uuid(cart_id), CartItemId::from_uuid(item_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
