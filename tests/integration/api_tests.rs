//! API integration tests against a running server
//!
//! Start the server on a fresh database, then run with: cargo test -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080";

/// Suffix keeping emails and ISBNs unique across runs
fn unique() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{:08}", nanos % 100_000_000)
}

/// Register a fresh account and return a bearer header value
async fn get_auth_header(client: &Client) -> String {
    let email = format!("staff{}@mail.ru", unique());

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "email": email, "password": "test-pass" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "test-pass" }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    format!("Bearer {}", body["access_token"].as_str().expect("No token in response"))
}

async fn create_book(client: &Client, auth: &str, copies: i64) -> i64 {
    let response = client
        .post(format!("{}/books/", BASE_URL))
        .header("Authorization", auth)
        .json(&json!({
            "title": "Book",
            "author": "Author",
            "year": 2024,
            "isbn": format!("978-3-{}", unique()),
            "copies_available": copies
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

async fn create_reader(client: &Client, auth: &str) -> i64 {
    let response = client
        .post(format!("{}/readers/", BASE_URL))
        .header("Authorization", auth)
        .json(&json!({ "name": "Ivan", "email": format!("reader{}@mail.ru", unique()) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No reader ID")
}

async fn ledger_call(
    client: &Client,
    auth: &str,
    action: &str,
    book_id: i64,
    reader_id: i64,
) -> reqwest::Response {
    client
        .post(format!("{}/borrowing/{}", BASE_URL, action))
        .header("Authorization", auth)
        .json(&json!({ "book_id": book_id, "reader_id": reader_id }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn copies_available(client: &Client, book_id: i64) -> i64 {
    let body: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["copies_available"].as_i64().expect("No copies_available")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_wrong_password() {
    let client = Client::new();
    let email = format!("wrong{}@mail.ru", unique());

    client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "email": email, "password": "test-pass" }))
        .send()
        .await
        .expect("Failed to send request");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "another-pass" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_moves_counter() {
    let client = Client::new();
    let auth = get_auth_header(&client).await;
    let book_id = create_book(&client, &auth, 3).await;
    let reader_id = create_reader(&client, &auth).await;

    let response = ledger_call(&client, &auth, "borrow", book_id, reader_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["return_date"].is_null());
    assert_eq!(copies_available(&client, book_id).await, 2);

    let response = ledger_call(&client, &auth, "return", book_id, reader_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(!body["return_date"].is_null());
    assert_eq!(copies_available(&client, book_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_limit_three_books() {
    let client = Client::new();
    let auth = get_auth_header(&client).await;
    let reader_id = create_reader(&client, &auth).await;

    for i in 0..4 {
        let book_id = create_book(&client, &auth, 5).await;
        let response = ledger_call(&client, &auth, "borrow", book_id, reader_id).await;

        if i < 3 {
            assert_eq!(response.status(), StatusCode::OK);
        } else {
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: Value = response.json().await.expect("Failed to parse response");
            assert!(body["detail"].as_str().unwrap_or_default().contains("limit"));
        }
    }

    let response = client
        .get(format!("{}/borrowing/reader/{}", BASE_URL, reader_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
#[ignore]
async fn test_cannot_borrow_without_copies() {
    let client = Client::new();
    let auth = get_auth_header(&client).await;
    let book_id = create_book(&client, &auth, 0).await;
    let reader_id = create_reader(&client, &auth).await;

    let response = ledger_call(&client, &auth, "borrow", book_id, reader_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(copies_available(&client, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_cannot_return_not_borrowed() {
    let client = Client::new();
    let auth = get_auth_header(&client).await;
    let book_id = create_book(&client, &auth, 1).await;
    let reader_id = create_reader(&client, &auth).await;

    let response = ledger_call(&client, &auth, "return", book_id, reader_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_list_borrowings_rejects_large_limit() {
    let client = Client::new();
    let auth = get_auth_header(&client).await;

    let response = client
        .get(format!("{}/borrowing/?limit=500", BASE_URL))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(format!("{}/borrowing/?active_only=true&limit=10", BASE_URL))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["borrowings"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrowing/borrow", BASE_URL))
        .json(&json!({ "book_id": 1, "reader_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["detail"].is_string());
}
