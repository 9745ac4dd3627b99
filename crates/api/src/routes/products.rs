//! Product CRUD, filtering, and nested comment endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::{CategoryId, CommentId, DiscountId, Money, ProductId};
use domain::{NewComment, NewProduct, UpdateProduct};
use serde::{Deserialize, Serialize};
use store::{Comment, CommentStatus, Product, ProductFilter, ProductOrder, Store};

use crate::AppState;
use crate::error::ApiError;

pub fn router<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/products", get(list::<S>).post(create::<S>))
        .route(
            "/products/{id}",
            get(get_one::<S>).patch(update::<S>).delete(delete::<S>),
        )
        .route(
            "/products/{product_id}/comments",
            get(list_comments::<S>).post(create_comment::<S>),
        )
        .route(
            "/products/{product_id}/comments/{comment_id}",
            axum::routing::patch(moderate_comment::<S>),
        )
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub inventory: i32,
    pub category_id: uuid::Uuid,
    #[serde(default)]
    pub discount_ids: Vec<uuid::Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub inventory: Option<i32>,
    pub category_id: Option<uuid::Uuid>,
    pub discount_ids: Option<Vec<uuid::Uuid>>,
}

/// Query string for GET /products.
#[derive(Deserialize, Default)]
pub struct ListProductsQuery {
    pub category_id: Option<uuid::Uuid>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub desc: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub name: String,
    pub body: String,
}

#[derive(Deserialize)]
pub struct ListCommentsQuery {
    /// Moderation filter: `waiting`, `approved`, or `not_approved`. Absent
    /// means the public (approved-only) listing.
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ModerateCommentRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: uuid::Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    /// Price with 9% tax applied, rounded to the nearest cent.
    pub price_after_tax_cents: i64,
    pub inventory: i32,
    pub category_id: uuid::Uuid,
    pub discount_ids: Vec<uuid::Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id.as_uuid(),
            name: p.name,
            slug: p.slug,
            description: p.description,
            price_cents: p.price.cents(),
            price_after_tax_cents: p.price.with_markup_percent(9).cents(),
            inventory: p.inventory,
            category_id: p.category_id.as_uuid(),
            discount_ids: p.discount_ids.iter().map(|d| d.as_uuid()).collect(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProductPageResponse {
    pub items: Vec<ProductResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: uuid::Uuid,
    pub product_id: uuid::Uuid,
    pub name: String,
    pub body: String,
    pub status: CommentStatus,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        CommentResponse {
            id: c.id.as_uuid(),
            product_id: c.product_id.as_uuid(),
            name: c.name,
            body: c.body,
            status: c.status,
        }
    }
}

// -- Handlers --

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .catalog
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            price: Money::from_cents(req.price_cents),
            inventory: req.inventory,
            category_id: CategoryId::from_uuid(req.category_id),
            discount_ids: req
                .discount_ids
                .into_iter()
                .map(DiscountId::from_uuid)
                .collect(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products — filtering, ordering, pagination.
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ProductPageResponse>, ApiError> {
    let mut filter = ProductFilter::new();
    if let Some(category_id) = query.category_id {
        filter = filter.category(CategoryId::from_uuid(category_id));
    }
    if let Some(cents) = query.min_price_cents {
        filter = filter.min_price(Money::from_cents(cents));
    }
    if let Some(cents) = query.max_price_cents {
        filter = filter.max_price(Money::from_cents(cents));
    }
    if let Some(search) = query.search {
        filter = filter.search(search);
    }
    if let Some(order_by) = query.order_by.as_deref() {
        filter = filter.order_by(parse_order(order_by)?);
    }
    filter = filter.descending(query.desc);
    if let Some(page) = query.page {
        filter = filter.page(page);
    }
    if let Some(size) = query.page_size {
        filter = filter.page_size(size);
    }

    let page = state.catalog.list_products(filter).await?;
    Ok(Json(ProductPageResponse {
        items: page.items.into_iter().map(ProductResponse::from).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// GET /products/:id
pub async fn get_one<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog.get_product(ProductId::from_uuid(id)).await?;
    Ok(Json(product.into()))
}

/// PATCH /products/:id
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .catalog
        .update_product(
            ProductId::from_uuid(id),
            UpdateProduct {
                name: req.name,
                description: req.description,
                price: req.price_cents.map(Money::from_cents),
                inventory: req.inventory,
                category_id: req.category_id.map(CategoryId::from_uuid),
                discount_ids: req
                    .discount_ids
                    .map(|ids| ids.into_iter().map(DiscountId::from_uuid).collect()),
            },
        )
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/:id — 409 while order items still reference it.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_product(ProductId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /products/:product_id/comments — held for moderation.
#[tracing::instrument(skip(state, req))]
pub async fn create_comment<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<uuid::Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let comment = state
        .moderation
        .add_comment(
            ProductId::from_uuid(product_id),
            NewComment {
                name: req.name,
                body: req.body,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// GET /products/:product_id/comments — approved only unless a status filter
/// is given.
pub async fn list_comments<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<uuid::Uuid>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let product_id = ProductId::from_uuid(product_id);
    let comments = match query.status.as_deref() {
        None => state.moderation.list_public(product_id).await?,
        Some(raw) => {
            let status = parse_comment_status(raw)?;
            state.moderation.list_all(product_id, Some(status)).await?
        }
    };
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

/// PATCH /products/:product_id/comments/:comment_id — moderation action.
#[tracing::instrument(skip(state, req))]
pub async fn moderate_comment<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((product_id, comment_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(req): Json<ModerateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let status = parse_comment_status(&req.status)?;
    let comment = state
        .moderation
        .set_status(
            ProductId::from_uuid(product_id),
            CommentId::from_uuid(comment_id),
            status,
        )
        .await?;
    Ok(Json(comment.into()))
}

fn parse_order(raw: &str) -> Result<ProductOrder, ApiError> {
    match raw {
        "name" => Ok(ProductOrder::Name),
        "price" => Ok(ProductOrder::Price),
        "inventory" => Ok(ProductOrder::Inventory),
        other => Err(ApiError::BadRequest(format!(
            "unknown order_by value: {other}"
        ))),
    }
}

fn parse_comment_status(raw: &str) -> Result<CommentStatus, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}
