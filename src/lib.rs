pub mod client;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppState;
use crate::handlers::messages::{get_conversations, get_messages, get_unread_count, send_message};
use crate::middleware::{auth_middleware, request_id_middleware};

/// Messaging routes, all behind the session check
pub fn messaging_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/conversations", get(get_conversations))
        .route("/thread/:counterparty_id", get(get_messages))
        .route("/send", post(send_message))
        .route("/unread-count", get(get_unread_count))
        .layer(axum_middleware::from_fn_with_state(state, auth_middleware))
}

pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_credentials(true)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT, header::COOKIE]);

    Router::new()
        .nest("/api/messages", messaging_routes(state.clone()))
        .route("/health", get(|| async { "OK" }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(request_id_middleware))
                .layer(cors),
        )
        .with_state(state)
}
