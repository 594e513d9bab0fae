// Messaging API integration tests
// Drives the full router (auth, handlers, services) over the in-memory store
// Run with: cargo test --test messaging_api

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use market_messaging::config::AppState;
use market_messaging::create_app;
use market_messaging::middleware::JwtService;
use market_messaging::models::{UserProfile, UserRole};
use market_messaging::repositories::InMemoryMarketplace;

const SECRET: &str = "integration-test-secret";

const CUSTOMER: i64 = 10;
const OTHER_CUSTOMER: i64 = 11;
const VENDOR: i64 = 20;
const SEEDED_VENDOR: i64 = 21;

struct TestApp {
    server: TestServer,
    store: Arc<InMemoryMarketplace>,
}

async fn setup() -> TestApp {
    let store = Arc::new(InMemoryMarketplace::new());
    store.add_simple_user(CUSTOMER, "alice", UserRole::Customer).await;
    store.add_simple_user(OTHER_CUSTOMER, "dave", UserRole::Customer).await;
    store
        .add_user(UserProfile {
            id: VENDOR,
            username: "bob20".to_string(),
            business_name: Some("Bob's Bakery".to_string()),
            avatar: Some("/avatars/20.png".to_string()),
            role: UserRole::Vendor,
            is_active: true,
        })
        .await;
    store.add_simple_user(SEEDED_VENDOR, "cheese_corner", UserRole::Vendor).await;

    let state = AppState::new(SECRET, store.clone(), store.clone(), store.clone());
    let app = create_app(state, &["http://localhost:3000".to_string()]);

    TestApp {
        server: TestServer::new(app).unwrap(),
        store,
    }
}

fn bearer(user_id: i64, role: UserRole) -> HeaderValue {
    let token = JwtService::new(SECRET).generate_token(user_id, role).unwrap();
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

impl TestApp {
    async fn get(&self, path: &str, user_id: i64, role: UserRole) -> (StatusCode, Value) {
        let response = self
            .server
            .get(path)
            .add_header(header::AUTHORIZATION, bearer(user_id, role))
            .await;
        (response.status_code(), response.json::<Value>())
    }

    async fn send(&self, user_id: i64, role: UserRole, counterparty_id: i64, body: &str) -> (StatusCode, Value) {
        let response = self
            .server
            .post("/api/messages/send")
            .add_header(header::AUTHORIZATION, bearer(user_id, role))
            .json(&json!({ "counterparty_id": counterparty_id, "body": body }))
            .await;
        (response.status_code(), response.json::<Value>())
    }

    async fn unread(&self, user_id: i64, role: UserRole) -> i64 {
        let (status, body) = self.get("/api/messages/unread-count", user_id, role).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        body["unread_count"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_customer_to_vendor_scenario() {
    let app = setup().await;

    let (status, body) = app.send(CUSTOMER, UserRole::Customer, VENDOR, "Is this available?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"]["body"], "Is this available?");
    assert_eq!(body["message"]["sender_id"], CUSTOMER);
    assert_eq!(body["message"]["sender_display_name"], "alice");

    let (_, body) = app.get("/api/messages/conversations", VENDOR, UserRole::Vendor).await;
    assert_eq!(body["success"], true);
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["id"], CUSTOMER);
    assert_eq!(conversations[0]["unread_count"], 1);
    assert_eq!(conversations[0]["last_message"], "Is this available?");
    assert_eq!(app.unread(VENDOR, UserRole::Vendor).await, 1);

    let path = format!("/api/messages/thread/{}", CUSTOMER);
    let (status, body) = app.get(&path, VENDOR, UserRole::Vendor).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["counterparty_id"], CUSTOMER);

    for _ in 0..3 {
        assert_eq!(app.unread(VENDOR, UserRole::Vendor).await, 0);
        let (_, body) = app.get("/api/messages/conversations", VENDOR, UserRole::Vendor).await;
        assert_eq!(body["conversations"][0]["unread_count"], 0);
    }

    app.send(CUSTOMER, UserRole::Customer, VENDOR, "Still there?").await;
    assert_eq!(app.unread(VENDOR, UserRole::Vendor).await, 1);
}

#[tokio::test]
async fn test_empty_body_rejected_and_nothing_written() {
    let app = setup().await;

    let (status, body) = app.send(CUSTOMER, UserRole::Customer, VENDOR, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "error": "Message cannot be empty", "status": 400 }));

    assert_eq!(app.store.message_count().await, 0);
    assert_eq!(app.unread(VENDOR, UserRole::Vendor).await, 0);
    let path = format!("/api/messages/thread/{}", CUSTOMER);
    let (_, body) = app.get(&path, VENDOR, UserRole::Vendor).await;
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_overlong_whitespace_body_is_empty_not_too_long() {
    let app = setup().await;

    let (status, body) = app.send(CUSTOMER, UserRole::Customer, VENDOR, &" ".repeat(6000)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message cannot be empty");
    assert_eq!(app.store.message_count().await, 0);

    let padded = format!("{}Is this available?{}", " ".repeat(4000), " ".repeat(4000));
    let (status, body) = app.send(CUSTOMER, UserRole::Customer, VENDOR, &padded).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["body"], "Is this available?");
}

#[tokio::test]
async fn test_role_eligibility() {
    let app = setup().await;

    let (status, body) = app.send(CUSTOMER, UserRole::Customer, OTHER_CUSTOMER, "hi").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.send(CUSTOMER, UserRole::Customer, VENDOR, "hi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_unknown_counterparty_is_not_found() {
    let app = setup().await;

    let (status, body) = app.send(CUSTOMER, UserRole::Customer, 999, "hi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/messages/thread/999", CUSTOMER, UserRole::Customer).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thread_order_is_chronological_in_both_directions() {
    let app = setup().await;
    app.send(CUSTOMER, UserRole::Customer, VENDOR, "t1").await;
    app.send(VENDOR, UserRole::Vendor, CUSTOMER, "t2").await;
    app.send(CUSTOMER, UserRole::Customer, VENDOR, "t3").await;

    let path = format!("/api/messages/thread/{}", VENDOR);
    let (_, body) = app.get(&path, CUSTOMER, UserRole::Customer).await;
    let bodies: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["t1", "t2", "t3"]);

    let vendor_message = &body["messages"][1];
    assert_eq!(vendor_message["sender_display_name"], "Bob's Bakery");
    assert_eq!(vendor_message["sender_avatar"], "/avatars/20.png");
}

#[tokio::test]
async fn test_order_history_seeds_conversation_after_real_ones() {
    let app = setup().await;
    app.store.record_order(CUSTOMER, SEEDED_VENDOR).await;
    app.send(VENDOR, UserRole::Vendor, CUSTOMER, "Thanks for your order!").await;

    let (_, body) = app.get("/api/messages/conversations", CUSTOMER, UserRole::Customer).await;
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 2);

    assert_eq!(conversations[0]["id"], VENDOR);
    assert_eq!(conversations[0]["display_name"], "Bob's Bakery");
    assert_eq!(conversations[0]["unread_count"], 1);

    assert_eq!(conversations[1]["id"], SEEDED_VENDOR);
    assert!(conversations[1]["last_message"].is_null());
    assert!(conversations[1]["last_message_time"].is_null());

    let sum: i64 = conversations.iter().map(|c| c["unread_count"].as_i64().unwrap()).sum();
    assert_eq!(sum, app.unread(CUSTOMER, UserRole::Customer).await);
}

#[tokio::test]
async fn test_store_outage_is_structured_failure() {
    let app = setup().await;
    app.store.set_unavailable(true);

    let (status, body) = app.send(CUSTOMER, UserRole::Customer, VENDOR, "hi").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Message store unavailable");

    app.store.set_unavailable(false);
    assert_eq!(app.store.message_count().await, 0);
}

#[tokio::test]
async fn test_unauthenticated_requests_rejected() {
    let app = setup().await;

    let response = app.server.get("/api/messages/unread-count").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/messages/conversations")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer not-a-token"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_send_payload() {
    let app = setup().await;

    let response = app
        .server
        .post("/api/messages/send")
        .add_header(header::AUTHORIZATION, bearer(CUSTOMER, UserRole::Customer))
        .json(&json!({ "body": "missing counterparty" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}
