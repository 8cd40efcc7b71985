use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Maximum message length in characters.
/// The server stores messages in a VARCHAR(255) column.
pub const MAX_MESSAGE_LENGTH: usize = 255;

/// Timestamp layouts the server is known to emit for `created_at`.
const CREATED_AT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Message {
    pub id: i64,
    pub message: String,
    pub created_at: String,
}

impl Message {
    /// Parse `created_at`, accepting both the server's `str(datetime)`
    /// rendering and RFC 3339.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(dt.naive_utc());
        }
        CREATED_AT_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.created_at, fmt).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    pub message: String,
}

/// Body the server sends back for a successful delete. The client does not
/// require it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub deleted: bool,
    pub id: Option<i64>,
}

/// Check message text before it is sent. Returns a human-readable reason on
/// rejection.
pub fn validate_message_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("Message cannot be empty".to_string());
    }
    let len = text.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message is {} characters, the limit is {}",
            len, MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}
