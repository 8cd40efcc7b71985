//! API client for the quicknote message server.
//!
//! Every authenticated call obtains the identity token from the
//! `SessionManager` (refreshing it if needed), attaches it as a bearer
//! credential, and normalizes failures into `ApiError`.

use std::sync::Arc;

use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::SessionManager;
use crate::models::{
    validate_message_text, CreateMessage, DeleteResponse, HealthStatus, Message,
    MessagesResponse, UserInfo,
};

use super::ApiError;

/// Whether a call needs the caller's identity token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Required,
    None,
}

/// API client for the message server.
/// Clone is cheap - reqwest::Client and the session manager are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    /// `None` for a client that only makes unauthenticated calls.
    sessions: Option<Arc<SessionManager>>,
}

impl ApiClient {
    /// Create a new API client. No request timeout is set: a call suspends
    /// until the server answers or the connection fails.
    pub fn new(base_url: impl Into<String>, sessions: Arc<SessionManager>) -> Result<Self, ApiError> {
        Self::build(base_url.into(), Some(sessions))
    }

    /// A client with no identity pool behind it, for the health check.
    /// Every authenticated call fails with `NotAuthenticated`.
    pub fn unauthenticated(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::build(base_url.into(), None)
    }

    fn build(base_url: String, sessions: Option<Arc<SessionManager>>) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sessions(&self) -> Option<&Arc<SessionManager>> {
        self.sessions.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn bearer_token(&self) -> Result<String, ApiError> {
        let Some(sessions) = &self.sessions else {
            return Err(ApiError::NotAuthenticated);
        };
        sessions
            .identity_token()
            .await?
            .ok_or(ApiError::NotAuthenticated)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    /// Send one request. The session is consulted before anything touches
    /// the network, so a missing session fails without a request.
    async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: Auth,
    ) -> Result<Response, ApiError> {
        let token = match auth {
            Auth::Required => Some(self.bearer_token().await?),
            Auth::None => None,
        };

        let url = self.url(path);
        debug!(%method, url = %url, "Sending request");

        let mut request = self.client.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        Self::check_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, auth: Auth) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, path, None::<&()>, auth).await?;
        Self::parse_json(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let response = self
            .execute(Method::POST, path, Some(body), Auth::Required)
            .await?;
        Self::parse_json(response, path).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .execute(Method::DELETE, path, None::<&()>, Auth::Required)
            .await?;
        // The receipt is informational; a missing or odd body is still success.
        let body = response.text().await.unwrap_or_default();
        if let Ok(receipt) = serde_json::from_str::<DeleteResponse>(&body) {
            debug!(path, deleted = receipt.deleted, id = ?receipt.id, "Delete acknowledged");
        }
        Ok(())
    }

    // ===== Domain operations =====

    /// Liveness probe. The only call that works without a session.
    pub async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        self.get("/", Auth::None).await
    }

    pub async fn current_user(&self) -> Result<UserInfo, ApiError> {
        self.get("/auth/me", Auth::Required).await
    }

    /// All of the caller's messages, most recent first.
    pub async fn list_messages(&self) -> Result<Vec<Message>, ApiError> {
        let response: MessagesResponse = self.get("/messages", Auth::Required).await?;
        Ok(response.messages)
    }

    /// Create a message. Text is validated locally first; invalid text
    /// never reaches the server.
    pub async fn create_message(&self, text: &str) -> Result<Message, ApiError> {
        validate_message_text(text).map_err(ApiError::InvalidMessage)?;
        let body = CreateMessage {
            message: text.to_string(),
        };
        self.post("/messages", &body).await
    }

    pub async fn delete_message(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/messages/{}", id)).await
    }
}
