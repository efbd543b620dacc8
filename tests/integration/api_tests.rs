//! API integration tests
//!
//! Drive the full router in-process against an in-memory database.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_api::{
    api,
    config::{AppConfig, DatabaseConfig},
    models::BookMetadata,
    repository::Repository,
    services::{metadata::MetadataProvider, Services},
    AppState,
};

const BASE_URL: &str = "/api/v1";

/// Registry that only knows one ISBN
struct StubRegistry;

#[async_trait]
impl MetadataProvider for StubRegistry {
    async fn fetch_by_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        (isbn == "9780441013593").then(|| BookMetadata {
            title: Some("Dune".to_string()),
            author: Some("Frank Herbert".to_string()),
            year: Some(1965),
            description: Some("Desert planet".to_string()),
            cover_url: Some("http://covers.example/dune.jpg".to_string()),
            ..Default::default()
        })
    }
}

async fn app() -> Router {
    let config = AppConfig {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let repository = Repository::connect(&config.database)
        .await
        .expect("Failed to open database");
    let services = Services::new(repository, Arc::new(StubRegistry), &config.metadata);

    api::create_router(AppState::new(config, services).expect("Failed to build state"))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    (status, headers, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, value)
}

async fn create_book(app: &Router, body: Value) -> Value {
    let (status, book) = send_json(app, "POST", &format!("{}/books", BASE_URL), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", book);
    book
}

fn titles(books: &Value) -> Vec<&str> {
    books
        .as_array()
        .expect("Expected an array")
        .iter()
        .filter_map(|b| b["title"].as_str())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;
    let (status, body) = send_json(&app, "GET", &format!("{}/health", BASE_URL), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = send_json(&app, "GET", &format!("{}/ready", BASE_URL), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_and_read_book() {
    let app = app().await;
    let created = create_book(
        &app,
        json!({"title": "Test Book", "author": "Tester", "year": 2024, "isbn": "123-456"}),
    )
    .await;

    assert!(created["id"].is_i64());
    assert!(created["created_at"].is_string());
    assert_eq!(created["isbn"], "123456");
    assert_eq!(created["status"], "available");

    let (status, book) = send_json(
        &app,
        "GET",
        &format!("{}/books/{}", BASE_URL, created["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["title"], "Test Book");
}

#[tokio::test]
async fn test_duplicate_isbn_rejected() {
    let app = app().await;
    create_book(&app, json!({"title": "First", "author": "Tester", "isbn": "123-456"})).await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("{}/books", BASE_URL),
        Some(json!({"title": "Second", "author": "Tester", "isbn": "123456"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Duplicate");
}

#[tokio::test]
async fn test_create_validation() {
    let app = app().await;
    let uri = format!("{}/books", BASE_URL);

    for body in [
        json!({"title": "", "author": "Tester"}),
        json!({"title": "Old", "author": "Tester", "year": 999}),
        json!({"title": "Thick", "author": "Tester", "page_count": 0}),
        json!({"title": "Long ISBN", "author": "Tester", "isbn": "1".repeat(21)}),
        json!({"title": "Bad status", "author": "Tester", "status": "lost"}),
        json!({"author": "Tester"}),
    ] {
        let (status, response) = send_json(&app, "POST", &uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} -> {}", body, response);
    }

    let (status, _, _) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_enriches_from_registry() {
    let app = app().await;
    let created = create_book(
        &app,
        json!({"title": "Dune", "author": "F. Herbert", "isbn": "978-0-441-01359-3"}),
    )
    .await;

    assert_eq!(created["author"], "F. Herbert");
    assert_eq!(created["description"], "Desert planet");
    assert_eq!(created["cover_url"], "http://covers.example/dune.jpg");
    assert_eq!(created["year"], 1965);
}

#[tokio::test]
async fn test_search_books() {
    let app = app().await;
    create_book(&app, json!({"title": "Search Target", "author": "Finder", "year": 2022, "isbn": "555-555-555"})).await;
    create_book(&app, json!({"title": "Unrelated", "author": "Someone", "year": 1990})).await;

    let (status, books) = send_json(&app, "GET", &format!("{}/books?q=Search", BASE_URL), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&books), vec!["Search Target"]);

    let (_, books) = send_json(&app, "GET", &format!("{}/books?q=sEaRcH%20tArGeT", BASE_URL), None).await;
    assert_eq!(titles(&books), vec!["Search Target"]);

    let (_, books) = send_json(&app, "GET", &format!("{}/books?q=finder", BASE_URL), None).await;
    assert_eq!(titles(&books), vec!["Search Target"]);

    let (_, books) = send_json(
        &app,
        "GET",
        &format!("{}/books?year_min=1980&year_max=2000", BASE_URL),
        None,
    )
    .await;
    assert_eq!(titles(&books), vec!["Unrelated"]);

    let (_, books) = send_json(
        &app,
        "GET",
        &format!("{}/books?sort=title&order=asc", BASE_URL),
        None,
    )
    .await;
    assert_eq!(titles(&books), vec!["Search Target", "Unrelated"]);
}

#[tokio::test]
async fn test_total_count_header() {
    let app = app().await;
    for title in ["One", "Two", "Three"] {
        create_book(&app, json!({"title": title, "author": "Counter"})).await;
    }

    let (status, headers, bytes) = send(&app, "GET", &format!("{}/books?limit=1", BASE_URL), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-total-count"], "3");

    let books: Value = serde_json::from_slice(&bytes).expect("Failed to parse response");
    assert_eq!(books.as_array().map(Vec::len), Some(1));

    let (_, headers, _) = send(&app, "GET", &format!("{}/books?q=nothing-matches", BASE_URL), None).await;
    assert_eq!(headers["x-total-count"], "0");
}

#[tokio::test]
async fn test_list_rejects_bad_query() {
    let app = app().await;

    for query in [
        "year_min=2100&year_max=1000",
        "limit=0",
        "limit=101",
        "skip=-1",
        "year=abc",
    ] {
        let (status, _) = send_json(&app, "GET", &format!("{}/books?{}", BASE_URL, query), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
    }
}

#[tokio::test]
async fn test_update_book() {
    let app = app().await;
    let created = create_book(
        &app,
        json!({"title": "Old Title", "author": "Tester", "year": 2024, "isbn": "888-888"}),
    )
    .await;
    let uri = format!("{}/books/{}", BASE_URL, created["id"]);

    let (status, updated) = send_json(&app, "PUT", &uri, Some(json!({"title": "New Title"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "New Title");
    assert_eq!(updated["author"], created["author"]);
    assert_eq!(updated["year"], created["year"]);
    assert_eq!(updated["isbn"], created["isbn"]);
    assert_eq!(updated["created_at"], created["created_at"]);
    assert!(created["updated_at"].is_null());
    assert!(updated["updated_at"].is_string());

    let (status, updated) = send_json(&app, "PUT", &uri, Some(json!({"year": null, "status": "borrowed"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["year"].is_null());
    assert_eq!(updated["status"], "borrowed");
    assert_eq!(updated["title"], "New Title");
}

#[tokio::test]
async fn test_update_errors() {
    let app = app().await;
    create_book(&app, json!({"title": "First", "author": "Tester", "isbn": "111-111"})).await;
    let second = create_book(&app, json!({"title": "Second", "author": "Tester"})).await;

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("{}/books/{}", BASE_URL, second["id"]),
        Some(json!({"isbn": "111111"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Duplicate");

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("{}/books/{}", BASE_URL, second["id"]),
        Some(json!({"title": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("{}/books/999999", BASE_URL),
        Some(json!({"title": "Ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_book() {
    let app = app().await;
    let created = create_book(&app, json!({"title": "Delete Me", "author": "Tester", "isbn": "777-777"})).await;
    let uri = format!("{}/books/{}", BASE_URL, created["id"]);

    let (status, _, bytes) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(bytes.is_empty());

    let (status, _) = send_json(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchItem");
}

#[tokio::test]
async fn test_isbn_lookup() {
    let app = app().await;

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("{}/books/lookup/978-0441013593", BASE_URL),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["year"], 1965);

    for isbn in ["0000000000", "not-an-isbn", "%20-%20"] {
        let (status, _) = send_json(&app, "GET", &format!("{}/books/lookup/{}", BASE_URL, isbn), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", isbn);
    }
}

#[tokio::test]
async fn test_landing_page_and_docs() {
    let app = app().await;
    create_book(&app, json!({"title": "Shelved", "author": "Tester"})).await;

    let (status, headers, bytes) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[CONTENT_TYPE].to_str().unwrap_or_default().starts_with("text/html"));
    let page = String::from_utf8(bytes).expect("Invalid UTF-8");
    assert!(page.contains("Library API"));
    assert!(page.contains(r#"<strong id="stat-total">1</strong>"#));
    assert!(page.contains(r#"apiBase: "/api/v1""#));
    assert!(page.contains(r#"id="book-list""#));

    let (status, doc) = send_json(&app, "GET", &format!("{}/openapi.json", BASE_URL), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/books"].is_object());
    assert_eq!(
        doc["paths"]["/books/{id}"]["get"]["responses"]["404"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/ErrorResponse"
    );
    assert!(doc["components"]["schemas"]["ErrorResponse"].is_object());
}

#[tokio::test]
async fn test_static_ui_assets() {
    let app = app().await;

    let (status, headers, bytes) = send(&app, "GET", "/static/app.js", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[CONTENT_TYPE].to_str().unwrap_or_default().contains("javascript"));
    let script = String::from_utf8(bytes).expect("Invalid UTF-8");
    assert!(script.contains("APP_CONFIG"));
    assert!(script.contains("X-Total-Count"));

    let (status, _, _) = send(&app, "GET", "/static/styles.css", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/static/missing.js", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_path_id_uses_error_body() {
    let app = app().await;

    for (method, body) in [
        ("GET", None),
        ("PUT", Some(json!({"title": "X"}))),
        ("DELETE", None),
    ] {
        let (status, error) = send_json(&app, method, &format!("{}/books/abc", BASE_URL), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", method);
        assert_eq!(error["code"], 18);
        assert_eq!(error["error"], "BadValue");
        assert!(error["message"].is_string());
    }
}

#[tokio::test]
async fn test_isbn_normalization_keeps_length() {
    let app = app().await;
    let isbn = "ß".repeat(12);
    let created = create_book(&app, json!({"title": "Umlaut", "author": "Tester", "isbn": isbn})).await;

    let stored = created["isbn"].as_str().expect("isbn");
    assert_eq!(stored, isbn);
    assert!(stored.chars().count() <= 20);
}

#[tokio::test]
async fn test_search_and_sort_fold_case() {
    let app = app().await;
    for title in ["Zebra", "apple", "Élan Vital"] {
        create_book(&app, json!({"title": title, "author": "Tester"})).await;
    }

    let (status, books) = send_json(&app, "GET", &format!("{}/books?q=%C3%A9lan", BASE_URL), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&books), vec!["Élan Vital"]);

    let (_, books) = send_json(
        &app,
        "GET",
        &format!("{}/books?sort=title&order=asc&q=a", BASE_URL),
        None,
    )
    .await;
    assert_eq!(titles(&books), vec!["apple", "Zebra", "Élan Vital"]);
}
