use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use movie_booking::config::BookingConfig;
use movie_booking::middleware::{USER_ID_HEADER, USER_ROLE_HEADER};
use movie_booking::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    router(AppState::in_memory(&BookingConfig::default()))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = user {
        builder = builder.header(USER_ID_HEADER, id).header(USER_ROLE_HEADER, role);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

const ADMIN: Option<(&str, &str)> = Some(("root", "admin"));
const ALICE: Option<(&str, &str)> = Some(("alice", "member"));
const BOB: Option<(&str, &str)> = Some(("bob", "member"));

async fn create_showing(app: &Router, capacity: u32) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/movies",
        ADMIN,
        Some(json!({ "movie_name": "Dune", "theatre_name": "Odeon", "capacity": capacity })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

fn booking(showing_id: &str, seats: &[u32]) -> Option<Value> {
    Some(json!({ "showing_id": showing_id, "seat_numbers": seats }))
}

#[tokio::test]
async fn health_endpoints_answer_without_identity() {
    let app = app();
    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "database": true, "cache": true }));
}

#[tokio::test]
async fn api_requires_identity_header() {
    let app = app();
    let (status, _) = call(&app, Method::GET, "/api/movies/all", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_management_is_admin_only() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/movies",
        ALICE,
        Some(json!({ "movie_name": "Dune", "theatre_name": "Odeon", "capacity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, _) = call(&app, Method::GET, "/api/movies/all", ALICE, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    create_showing(&app, 5).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/movies",
        ADMIN,
        Some(json!({ "movie_name": "dune", "theatre_name": "ODEON", "capacity": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_EXISTS");

    let (status, body) = call(&app, Method::GET, "/api/movies/search/un", BOB, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::DELETE, "/api/movies/Dune/delete/Odeon", BOB, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, "/api/movies/Dune/delete/Odeon", ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::DELETE, "/api/movies/Dune/delete/Odeon", ADMIN, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_flow_over_http() {
    let app = app();
    let showing_id = create_showing(&app, 5).await;

    let (status, body) = call(&app, Method::POST, "/api/tickets/book", ALICE, booking(&showing_id, &[3, 1, 2])).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Booked Successfully");
    assert_eq!(body["ticket"]["seat_numbers"], json!([1, 2, 3]));
    assert_eq!(body["ticket"]["user_id"], "alice");

    let (status, body) = call(&app, Method::POST, "/api/tickets/book", BOB, booking(&showing_id, &[3, 4])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SEAT_CONFLICT");
    assert_eq!(body["seats"], json!([3]));
    assert_eq!(body["retryable"], false);

    let uri = format!("/api/showings/{showing_id}/availability");
    let (_, body) = call(&app, Method::GET, &uri, BOB, None).await;
    assert_eq!(body["available"], 2);

    let (status, _) = call(&app, Method::POST, "/api/tickets/book", BOB, booking(&showing_id, &[4, 5])).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/showings/{showing_id}/status");
    let (_, body) = call(&app, Method::GET, &uri, BOB, None).await;
    assert_eq!(body["status"], "SOLD_OUT");

    let (status, body) = call(&app, Method::POST, "/api/tickets/book", BOB, booking(&showing_id, &[6])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let uri = format!("/api/showings/{showing_id}/booking-info");
    let (status, body) = call(&app, Method::GET, &uri, ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booked_seats"], json!([1, 2, 3, 4, 5]));
    assert_eq!(body["available"], 0);
}

#[tokio::test]
async fn unknown_showing_is_404() {
    let app = app();
    let missing = uuid::Uuid::new_v4();

    let (status, body) = call(&app, Method::POST, "/api/tickets/book", ALICE, booking(&missing.to_string(), &[1])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let uri = format!("/api/showings/{missing}/status");
    let (status, _) = call(&app, Method::GET, &uri, ALICE, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_seat_list_is_rejected() {
    let app = app();
    let showing_id = create_showing(&app, 5).await;

    let (status, body) = call(&app, Method::POST, "/api/tickets/book", ALICE, booking(&showing_id, &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn ticket_visibility_follows_role() {
    let app = app();
    let showing_id = create_showing(&app, 5).await;
    call(&app, Method::POST, "/api/tickets/book", ALICE, booking(&showing_id, &[1])).await;

    let (status, body) = call(&app, Method::GET, "/api/tickets/mine", ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::GET, "/api/tickets/user/alice", BOB, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::GET, "/api/tickets/user/alice", ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["seat_numbers"], json!([1]));
}
