//! End-to-end tests of the router over an in-memory database

use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use bookshelf_common::config::DatabaseConfig;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const STAFF: &str = "librarian";

async fn app() -> Router {
    let mut config = AppConfig::default();
    config.database = DatabaseConfig::in_memory();
    config.auth.staff_usernames = vec![STAFF.to_string()];
    config.rate_limit.enabled = false;

    let db = DbPool::new(&config.database).await.unwrap();
    let state = AppState {
        config: Arc::new(config),
        db,
        jwt: Arc::new(JwtManager::new("test_secret", 3600)),
    };
    create_router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
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
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/accounts/register",
        None,
        Some(json!({
            "username": username,
            "first_name": "Test",
            "last_name": "Reader",
            "email": format!("{}@example.com", username),
            "password": "s3cret-pass",
            "password_confirm": "s3cret-pass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn create_author(app: &Router, token: &str, first: &str, last: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/authors",
        Some(token),
        Some(json!({ "first_name": first, "last_name": last })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

async fn create_book(app: &Router, token: &str, title: &str, author_id: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/books",
        Some(token),
        Some(json!({ "title": title, "author_id": author_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["primary"]["up"], true);
    assert!(body.get("replica").is_none());
}

#[tokio::test]
async fn test_lists_are_public_and_details_need_a_token() {
    let app = app().await;
    let staff = register(&app, STAFF).await;
    let author_id = create_author(&app, &staff, "Ursula", "Le Guin").await;

    let (status, body) = send(&app, Method::GET, "/api/authors", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["is_paginated"], false);

    let uri = format!("/api/authors/{}", author_id);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, body) = send(&app, Method::GET, &uri, Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    let (status, body) = send(&app, Method::GET, &uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Ursula Le Guin");
}

#[tokio::test]
async fn test_writes_need_staff() {
    let app = app().await;
    let reader = register(&app, "reader").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/genres",
        Some(&reader),
        Some(json!({ "name": "Fantasy" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let staff = register(&app, STAFF).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/genres",
        Some(&staff),
        Some(json!({ "name": "Fantasy" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Fantasy");
}

#[tokio::test]
async fn test_missing_record_and_page() {
    let app = app().await;
    let staff = register(&app, STAFF).await;

    let uri = format!("/api/books/{}", Uuid::new_v4());
    let (status, body) = send(&app, Method::GET, &uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "BOOK_NOT_FOUND");

    // An empty list still has a first page
    let (status, body) = send(&app, Method::GET, "/api/books?page=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));

    let (status, _) = send(&app, Method::GET, "/api/books?page=2", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pagination() {
    let app = app().await;
    let staff = register(&app, STAFF).await;
    let author_id = create_author(&app, &staff, "Terry", "Pratchett").await;
    for n in 0..12 {
        create_book(&app, &staff, &format!("Discworld {:02}", n), &author_id).await;
    }

    let (status, body) = send(&app, Method::GET, "/api/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["is_paginated"], true);

    let (status, body) = send(&app, Method::GET, "/api/books?page=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::GET, "/api/books?page=3", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_errors_name_the_field() {
    let app = app().await;
    register(&app, "reader").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts/login",
        None,
        Some(json!({ "username": "nobody", "password": "whatever" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["field"], "username");
    assert_eq!(body["error"]["message"], "This user name does not exist.");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts/login",
        None,
        Some(json!({ "username": "reader", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["field"], "password");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts/login",
        None,
        Some(json!({ "username": "reader", "password": "s3cret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["username"], "reader");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_username() {
    let app = app().await;
    register(&app, "reader").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts/register",
        None,
        Some(json!({
            "username": "reader",
            "first_name": "Other",
            "last_name": "Reader",
            "email": "other@example.com",
            "password": "s3cret-pass",
            "password_confirm": "s3cret-pass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn test_password_change() {
    let app = app().await;
    let token = register(&app, "reader").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts/password",
        Some(&token),
        Some(json!({
            "old_password": "not-it",
            "new_password": "n3w-password",
            "new_password_confirm": "n3w-password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "old_password");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/accounts/password",
        Some(&token),
        Some(json!({
            "old_password": "s3cret-pass",
            "new_password": "n3w-password",
            "new_password_confirm": "n3w-password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/accounts/login",
        None,
        Some(json!({ "username": "reader", "password": "n3w-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reading_status_flow() {
    let app = app().await;
    let staff = register(&app, STAFF).await;
    let reader = register(&app, "reader").await;
    let author_id = create_author(&app, &staff, "Frank", "Herbert").await;
    let book_id = create_book(&app, &staff, "Dune", &author_id).await;
    let status_uri = format!("/api/books/{}/status", book_id);

    let (status, body) = send(
        &app,
        Method::POST,
        &status_uri,
        Some(&reader),
        Some(json!({ "status": "reading" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);
    assert_eq!(body["relation"]["status"], "reading");
    assert!(!body["relation"]["reading_date"].is_null());

    let (status, body) = send(
        &app,
        Method::POST,
        &status_uri,
        Some(&reader),
        Some(json!({ "status": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "status");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/books/{}/rating", book_id),
        Some(&reader),
        Some(json!({ "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relation"]["rating"], 4);

    let (status, body) = send(&app, Method::GET, "/api/my-books?status=reading", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["book"]["title"], "Dune");

    let (status, body) = send(&app, Method::GET, "/api/my-books", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _) = send(&app, Method::DELETE, &status_uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &status_uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_author_delete() {
    let app = app().await;
    let staff = register(&app, STAFF).await;
    let author_id = create_author(&app, &staff, "Isaac", "Asimov").await;
    let book_id = create_book(&app, &staff, "Foundation", &author_id).await;
    let author_uri = format!("/api/authors/{}", author_id);

    let (status, body) = send(&app, Method::DELETE, &author_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PROTECTED_REFERENCE");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/books/{}", book_id), Some(&staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &author_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_search() {
    let app = app().await;
    let staff = register(&app, STAFF).await;
    let author_id = create_author(&app, &staff, "Mary", "Shelley").await;
    create_book(&app, &staff, "Frankenstein", &author_id).await;
    create_book(&app, &staff, "The Last Man", &author_id).await;

    let (status, body) = send(&app, Method::GET, "/api/search?q=shelley", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 2);
    assert_eq!(body["authors"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/api/search?q=frank", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"][0]["title"], "Frankenstein");

    let (status, body) = send(&app, Method::GET, "/api/search", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 0);
}
