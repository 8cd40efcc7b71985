use serde::{Deserialize, Serialize};

/// The authenticated caller, as the server resolves it from the identity
/// token. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserInfo {
    pub id: i64,
    pub email: Option<String>,
    pub cognito_sub: String,
}

impl UserInfo {
    /// Email for display, falling back to the subject id.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.cognito_sub)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}
