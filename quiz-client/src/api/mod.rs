//! REST gateway. One request per call, no client-side retries.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use quiz_types::{ApiResponse, ErrorBody};

pub mod achievements;
pub mod auth;
pub mod games;
pub mod notifications;
pub mod rooms;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Response contained no data")]
    MissingData,
}

impl ApiError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(message) | ApiError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Shared HTTP client for the quiz backend. Cheap to clone; clones share the token.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            debug!("Request failed ({}): {}", status, message);

            return Err(if status == StatusCode::UNAUTHORIZED {
                ApiError::Unauthorized(message)
            } else {
                ApiError::Server {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            warn!("Could not decode response envelope: {}", e);
            ApiError::Decode(e)
        })?;

        if !envelope.success {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            });
        }

        Ok(envelope)
    }

    /// Send and return the envelope's `data`, which must be present.
    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.send(builder).await?.data.ok_or(ApiError::MissingData)
    }

    /// Send and keep only the envelope's message.
    async fn acknowledge(&self, builder: RequestBuilder) -> Result<Option<String>, ApiError> {
        Ok(self.send::<IgnoredAny>(builder).await?.message)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(self.request(Method::GET, path)).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.fetch(self.request(Method::POST, path).json(body)).await
    }
}
