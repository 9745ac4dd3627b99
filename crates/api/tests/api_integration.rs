//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let state = api::create_state(MemoryStore::new());
    api::create_app(state, get_metrics_handle())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Creates a category and a product, returning their ids.
async fn seed_product(app: &axum::Router, price_cents: i64) -> (String, String) {
    let response = send(
        app,
        "POST",
        "/categories",
        Some(serde_json::json!({ "title": "Furniture" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let category = body_json(response).await;
    let category_id = category["id"].as_str().unwrap().to_string();

    let response = send(
        app,
        "POST",
        "/products",
        Some(serde_json::json!({
            "name": "Walnut Desk",
            "price_cents": price_cents,
            "inventory": 5,
            "category_id": category_id,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product = body_json(response).await;
    (category_id, product["id"].as_str().unwrap().to_string())
}

async fn seed_customer(app: &axum::Router) -> String {
    let response = send(
        app,
        "POST",
        "/customers",
        Some(serde_json::json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "address": { "province": "ON", "city": "Toronto", "street": "1 King St" },
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check() {
    let app = setup();
    let response = send(&app, "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let app = setup();
    let response = send(&app, "GET", "/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_response_includes_tax_field() {
    let app = setup();
    let (_, product_id) = seed_product(&app, 1000).await;

    let response = send(&app, "GET", &format!("/products/{product_id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["price_cents"], 1000);
    assert_eq!(json["price_after_tax_cents"], 1090);
    assert_eq!(json["slug"], "walnut-desk");
}

#[tokio::test]
async fn short_product_name_is_422_with_field_errors() {
    let app = setup();
    let (category_id, _) = seed_product(&app, 1000).await;

    let response = send(
        &app,
        "POST",
        "/products",
        Some(serde_json::json!({
            "name": "Abc",
            "price_cents": 100,
            "inventory": 1,
            "category_id": category_id,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["errors"]["name"].is_string());
}

#[tokio::test]
async fn duplicate_cart_add_merges_into_one_item() {
    let app = setup();
    let (_, product_id) = seed_product(&app, 1000).await;

    let response = send(&app, "POST", "/carts", None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cart_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let items_uri = format!("/carts/{cart_id}/items");
    let add = serde_json::json!({ "product_id": product_id, "quantity": 2 });
    let response = send(&app, "POST", &items_uri, Some(add)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let add = serde_json::json!({ "product_id": product_id, "quantity": 3 });
    let response = send(&app, "POST", &items_uri, Some(add)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let merged = body_json(response).await;
    assert_eq!(merged["quantity"], 5);

    // One line, summed quantity, live total.
    let response = send(&app, "GET", &format!("/carts/{cart_id}"), None).await;
    let json = body_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
    assert_eq!(json["items"][0]["quantity"], 5);
    assert_eq!(json["items"][0]["item_total_cents"], 5000);
    assert_eq!(json["total_price_cents"], 5000);
}

#[tokio::test]
async fn cart_item_paths_reject_non_uuid_segments() {
    let app = setup();
    let response = send(&app, "GET", "/carts/not-a-uuid", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "DELETE",
        "/carts/00000000-0000-0000-0000-000000000000/items/also-not-a-uuid",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_freezes_price_and_survives_catalog_reprice() {
    let app = setup();
    let (_, product_id) = seed_product(&app, 1000).await;
    let customer_id = seed_customer(&app).await;

    let response = send(
        &app,
        "POST",
        "/orders",
        Some(serde_json::json!({
            "customer_id": customer_id,
            "items": [{ "product_id": product_id, "quantity": 2 }],
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "unpaid");
    assert_eq!(order["total_cents"], 2000);

    let response = send(
        &app,
        "PATCH",
        &format!("/products/{product_id}"),
        Some(serde_json::json!({ "price_cents": 9999 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    let json = body_json(response).await;
    assert_eq!(json["items"][0]["unit_price_cents"], 1000);
    assert_eq!(json["total_cents"], 2000);
}

#[tokio::test]
async fn ordered_product_delete_conflicts() {
    let app = setup();
    let (_, product_id) = seed_product(&app, 1000).await;
    let customer_id = seed_customer(&app).await;

    send(
        &app,
        "POST",
        "/orders",
        Some(serde_json::json!({
            "customer_id": customer_id,
            "items": [{ "product_id": product_id, "quantity": 1 }],
        })),
    )
    .await;

    let response = send(&app, "DELETE", &format!("/products/{product_id}"), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn category_with_products_delete_conflicts() {
    let app = setup();
    let (category_id, _) = seed_product(&app, 1000).await;

    let response = send(&app, "DELETE", &format!("/categories/{category_id}"), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn order_status_patch_roundtrip() {
    let app = setup();
    let (_, product_id) = seed_product(&app, 1000).await;
    let customer_id = seed_customer(&app).await;

    let response = send(
        &app,
        "POST",
        "/orders",
        Some(serde_json::json!({
            "customer_id": customer_id,
            "items": [{ "product_id": product_id, "quantity": 1 }],
        })),
    )
    .await;
    let order_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}"),
        Some(serde_json::json!({ "status": "paid" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "paid");

    let response = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}"),
        Some(serde_json::json!({ "status": "shipped" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comments_hidden_until_approved() {
    let app = setup();
    let (_, product_id) = seed_product(&app, 1000).await;

    let comments_uri = format!("/products/{product_id}/comments");
    let response = send(
        &app,
        "POST",
        &comments_uri,
        Some(serde_json::json!({ "name": "Ada", "body": "Solid desk." })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment = body_json(response).await;
    assert_eq!(comment["status"], "waiting");
    let comment_id = comment["id"].as_str().unwrap().to_string();

    // Public listing is empty until moderation approves.
    let response = send(&app, "GET", &comments_uri, None).await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());

    let response = send(
        &app,
        "PATCH",
        &format!("{comments_uri}/{comment_id}"),
        Some(serde_json::json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", &comments_uri, None).await;
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["status"], "approved");
}

#[tokio::test]
async fn product_listing_filters_and_paginates() {
    let app = setup();
    let (category_id, _) = seed_product(&app, 1000).await;

    for (name, price) in [("Oak Bookshelf", 2000), ("Brass Floor Lamp", 3000)] {
        let response = send(
            &app,
            "POST",
            "/products",
            Some(serde_json::json!({
                "name": name,
                "price_cents": price,
                "inventory": 1,
                "category_id": category_id,
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&app, "GET", "/products?search=lamp", None).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["name"], "Brass Floor Lamp");

    let response = send(
        &app,
        "GET",
        "/products?order_by=price&desc=true&page_size=2",
        None,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["items"][0]["price_cents"], 3000);

    let response = send(&app, "GET", "/products?min_price_cents=1500", None).await;
    assert_eq!(body_json(response).await["total"], 2);

    let response = send(&app, "GET", "/products?order_by=weight", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_are_404() {
    let app = setup();
    let missing = uuid::Uuid::new_v4();

    for uri in [
        format!("/products/{missing}"),
        format!("/categories/{missing}"),
        format!("/customers/{missing}"),
        format!("/orders/{missing}"),
        format!("/carts/{missing}"),
    ] {
        let response = send(&app, "GET", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn customer_detail_includes_address() {
    let app = setup();
    let customer_id = seed_customer(&app).await;

    let response = send(&app, "GET", &format!("/customers/{customer_id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["address"]["city"], "Toronto");

    // The list view omits the address.
    let response = send(&app, "GET", "/customers", None).await;
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert!(json[0].get("address").is_none());
}
