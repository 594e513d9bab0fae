// Messaging API client
// Speaks the `{ "success": ... }` envelope served under /api/messages

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::PollerConfig;
use crate::models::{ConversationSummary, MessageResponse, UserId};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// The four messaging operations, as seen from a client session
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Fetching a thread marks its incoming messages read on the server
    async fn thread(&self, counterparty_id: UserId) -> Result<Vec<MessageResponse>>;

    async fn unread_count(&self) -> Result<i64>;

    async fn send_message(&self, counterparty_id: UserId, body: &str) -> Result<MessageResponse>;
}

pub struct HttpMessagingApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpMessagingApi {
    pub fn new(config: &PollerConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(ClientError::Config("session token is required".to_string()));
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/messages{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;

        read_envelope(response.status(), response.json().await?)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        read_envelope(response.status(), response.json().await?)
    }
}

/// Unwrap a `{ success, error }` envelope into its payload object
fn read_envelope(status: StatusCode, body: Value) -> Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }

    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("Request failed")
        .to_string();

    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn field<T: DeserializeOwned>(mut body: Value, name: &str) -> Result<T> {
    let value = body
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| ClientError::Decode(format!("missing field `{}`", name)))?;

    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    async fn conversations(&self) -> Result<Vec<ConversationSummary>> {
        field(self.get("/conversations").await?, "conversations")
    }

    async fn thread(&self, counterparty_id: UserId) -> Result<Vec<MessageResponse>> {
        field(self.get(&format!("/thread/{}", counterparty_id)).await?, "messages")
    }

    async fn unread_count(&self) -> Result<i64> {
        field(self.get("/unread-count").await?, "unread_count")
    }

    async fn send_message(&self, counterparty_id: UserId, body: &str) -> Result<MessageResponse> {
        let payload = json!({ "counterparty_id": counterparty_id, "body": body });
        field(self.post("/send", payload).await?, "message")
    }
}
