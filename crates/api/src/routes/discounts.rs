//! Discount endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use domain::NewDiscount;
use serde::{Deserialize, Serialize};
use store::{Discount, Store};

use crate::AppState;
use crate::error::ApiError;

pub fn router<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new().route("/discounts", get(list::<S>).post(create::<S>))
}

#[derive(Deserialize)]
pub struct CreateDiscountRequest {
    pub percentage: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
pub struct DiscountResponse {
    pub id: uuid::Uuid,
    pub percentage: f64,
    pub description: String,
}

impl From<Discount> for DiscountResponse {
    fn from(d: Discount) -> Self {
        DiscountResponse {
            id: d.id.as_uuid(),
            percentage: d.percentage,
            description: d.description,
        }
    }
}

/// POST /discounts
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateDiscountRequest>,
) -> Result<(StatusCode, Json<DiscountResponse>), ApiError> {
    let discount = state
        .catalog
        .create_discount(NewDiscount {
            percentage: req.percentage,
            description: req.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(discount.into())))
}

/// GET /discounts
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<DiscountResponse>>, ApiError> {
    let discounts = state.catalog.list_discounts().await?;
    Ok(Json(discounts.into_iter().map(DiscountResponse::from).collect()))
}
