mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use car_marketplace::entities::car::CarStatus;
use car_marketplace::entities::user::UserRole;
use car_marketplace::routes::{create_router, IMAGE_BODY_LIMIT};

use common::{dealership_for, state, state_with, token_for, FakeStorage, FakeVision};

fn car_body(image: String) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "make": "Skoda",
        "model": "Octavia",
        "year": 2022,
        "price": 21000.0,
        "mileage": 9000,
        "color": "Silver",
        "fuel_type": "Diesel",
        "transmission": "Automatic",
        "body_type": "Estate",
        "images": [image]
    }))
    .unwrap()
}

fn post_car(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/admin/cars")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_phone_sized_photo_is_accepted() {
    let dealer = common::user(UserRole::Dealership);
    let info = dealership_for(&dealer);
    let stored = common::car(info.id, CarStatus::Available);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![dealer.clone()]])
        .append_query_results([vec![info]])
        .append_query_results([vec![stored]])
        .into_connection();
    let storage = Arc::new(FakeStorage::default());
    let app = create_router(state_with(db, storage.clone(), FakeVision("{}")));

    // about 3 MB once decoded, well past axum's 2 MB default
    let image = format!("data:image/jpeg;base64,{}", "A".repeat(4 * 1024 * 1024));
    let response = app
        .oneshot(post_car(&token_for(&dealer), car_body(image)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(storage.uploaded.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_oversized_body_is_payload_too_large() {
    let dealer = common::user(UserRole::Dealership);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![dealer.clone()]])
        .into_connection();
    let app = create_router(state(db));

    let image = format!("data:image/jpeg;base64,{}", "A".repeat(IMAGE_BODY_LIMIT));
    let response = app
        .oneshot(post_car(&token_for(&dealer), car_body(image)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_non_finite_loan_inputs_are_rejected() {
    for query in ["down_payment=NaN", "interest_rate=inf", "interest_rate=NaN&down_payment=100"] {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = create_router(state(db));

        let request = Request::builder()
            .uri(format!("/api/cars/{}/loan-estimate?{}", Uuid::new_v4(), query))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
    }
}
