use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("{message} ({status})")]
    RequestFailed { status: StatusCode, message: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Session(#[from] AuthError),
}

/// Message used when a failed response carries no usable `detail`.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload the server sends with non-2xx responses. `detail` is a
/// string for handled errors but a list for validation failures.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    detail: serde_json::Value,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Normalize a non-2xx response. Never fails: a body without a string
    /// `detail` gets the generic message.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorPayload>(body)
            .ok()
            .and_then(|p| p.detail.as_str().map(str::to_string))
            .filter(|d| !d.trim().is_empty())
            .map(|d| Self::truncate_body(&d))
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        ApiError::RequestFailed { status, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            ApiError::NetworkError(e) => e.status(),
            _ => None,
        }
    }

    /// The user must sign in (again) before retrying.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, ApiError::NotAuthenticated)
            || self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Text suitable for a status line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::RequestFailed { message, .. } => message.clone(),
            ApiError::InvalidMessage(msg) => msg.clone(),
            ApiError::NotAuthenticated => "Please sign in".to_string(),
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::Session(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
