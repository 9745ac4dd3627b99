//! Category CRUD endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::{CategoryId, ProductId};
use domain::{NewCategory, UpdateCategory};
use serde::{Deserialize, Serialize};
use store::{Category, Store};

use crate::AppState;
use crate::error::ApiError;

pub fn router<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/categories", get(list::<S>).post(create::<S>))
        .route(
            "/categories/{id}",
            get(get_one::<S>).patch(update::<S>).delete(delete::<S>),
        )
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub top_product: Option<uuid::Uuid>,
}

#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: uuid::Uuid,
    pub title: String,
    pub description: String,
    pub top_product: Option<uuid::Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u64>,
}

impl CategoryResponse {
    fn from_category(category: Category, product_count: Option<u64>) -> Self {
        CategoryResponse {
            id: category.id.as_uuid(),
            title: category.title,
            description: category.description,
            top_product: category.top_product.map(|p| p.as_uuid()),
            product_count,
        }
    }
}

/// POST /categories
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state
        .catalog
        .create_category(NewCategory {
            title: req.title,
            description: req.description,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse::from_category(category, None)),
    ))
}

/// GET /categories
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.catalog.list_categories().await?;
    Ok(Json(
        categories
            .into_iter()
            .map(|c| CategoryResponse::from_category(c, None))
            .collect(),
    ))
}

/// GET /categories/:id — includes the number of products in the category.
pub async fn get_one<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let id = CategoryId::from_uuid(id);
    let category = state.catalog.get_category(id).await?;
    let count = state.catalog.category_product_count(id).await?;
    Ok(Json(CategoryResponse::from_category(category, Some(count))))
}

/// PATCH /categories/:id
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state
        .catalog
        .update_category(
            CategoryId::from_uuid(id),
            UpdateCategory {
                title: req.title,
                description: req.description,
                top_product: req.top_product.map(ProductId::from_uuid),
            },
        )
        .await?;
    Ok(Json(CategoryResponse::from_category(category, None)))
}

/// DELETE /categories/:id — 409 while products still reference it.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_category(CategoryId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
