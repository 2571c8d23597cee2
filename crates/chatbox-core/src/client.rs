use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: Option<String>,
    error: Option<String>,
}

/// Why a send attempt failed; `Display` is the text shown to the user
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("A server error occurred.")]
    Status(StatusCode),
    #[error("{0}")]
    Application(String),
    #[error("Invalid server response: {0}")]
    Decode(String),
}

impl SendError {
    pub fn kind(&self) -> &'static str {
        match self {
            SendError::Transport(_) => "transport",
            SendError::Status(_) => "status",
            SendError::Application(_) => "application",
            SendError::Decode(_) => "decode",
        }
    }
}

/// Something that can answer a chat message
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Post one message and return the assistant's reply text
    async fn send(&self, message: &str) -> Result<String, SendError>;
}

/// Interpret a `/chat` response body
fn parse_reply(body: &str) -> Result<String, SendError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| SendError::Decode(e.to_string()))?;

    if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
        return Err(SendError::Application(error));
    }

    parsed
        .response
        .ok_or_else(|| SendError::Decode("missing \"response\" field".to_string()))
}

/// HTTP client for the `POST /chat` endpoint
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: Self::endpoint_for(base_url),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: Self::endpoint_for(base_url),
        })
    }

    fn endpoint_for(base_url: &str) -> String {
        format!("{}/chat", base_url.trim_end_matches('/'))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn send(&self, message: &str) -> Result<String, SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status(status));
        }

        let body = response.text().await?;
        parse_reply(&body)
    }
}
