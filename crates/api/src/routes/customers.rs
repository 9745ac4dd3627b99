//! Customer endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use common::CustomerId;
use domain::{NewAddress, NewCustomer};
use serde::{Deserialize, Serialize};
use store::{Address, Customer, Store};

use crate::AppState;
use crate::error::ApiError;

pub fn router<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/customers", get(list::<S>).post(create::<S>))
        .route("/customers/{id}", get(get_one::<S>))
}

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    pub address: AddressRequest,
}

#[derive(Deserialize)]
pub struct AddressRequest {
    pub province: String,
    pub city: String,
    pub street: String,
}

#[derive(Serialize)]
pub struct CustomerResponse {
    pub id: uuid::Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressResponse>,
}

#[derive(Serialize)]
pub struct AddressResponse {
    pub province: String,
    pub city: String,
    pub street: String,
}

impl CustomerResponse {
    fn from_customer(customer: Customer, address: Option<Address>) -> Self {
        CustomerResponse {
            id: customer.id.as_uuid(),
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email,
            phone_number: customer.phone_number,
            birth_date: customer.birth_date,
            address: address.map(|a| AddressResponse {
                province: a.province,
                city: a.city,
                street: a.street,
            }),
        }
    }
}

/// POST /customers — customer and address are created together.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    let customer = state
        .customers
        .create_customer(
            NewCustomer {
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                phone_number: req.phone_number,
                birth_date: req.birth_date,
            },
            NewAddress {
                province: req.address.province,
                city: req.address.city,
                street: req.address.street,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CustomerResponse::from_customer(customer, None)),
    ))
}

/// GET /customers
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CustomerResponse>>, ApiError> {
    let customers = state.customers.list_customers().await?;
    Ok(Json(
        customers
            .into_iter()
            .map(|c| CustomerResponse::from_customer(c, None))
            .collect(),
    ))
}

/// GET /customers/:id — includes the address.
pub async fn get_one<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let (customer, address) = state
        .customers
        .get_customer(CustomerId::from_uuid(id))
        .await?;
    Ok(Json(CustomerResponse::from_customer(customer, Some(address))))
}
