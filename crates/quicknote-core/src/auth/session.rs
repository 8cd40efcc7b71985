use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the real expiry at which an identity token is treated as
/// expired, so a token is never handed out just before it lapses.
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

/// The token triple issued by the identity provider for one signed-in
/// context. A session is either absent or carries all three tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity_token: String,
    pub access_token: String,
    pub refresh_token: String,
}

// Tokens are bearer credentials; keep them out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subject", &self.claims().and_then(|c| c.sub))
            .field("expires_at", &self.identity_expires_at())
            .finish_non_exhaustive()
    }
}

/// Claims read from the identity token payload. Only the fields the client
/// uses are decoded; the signature is verified server-side, never here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub token_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Session {
    pub fn new(
        identity_token: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            identity_token: identity_token.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// All three tokens present. Caches never hold a partial session.
    pub fn is_complete(&self) -> bool {
        !self.identity_token.is_empty()
            && !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
    }

    pub fn claims(&self) -> Option<TokenClaims> {
        decode_claims(&self.identity_token)
    }

    pub fn email(&self) -> Option<String> {
        self.claims().and_then(|c| c.email)
    }

    pub fn identity_expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims()
            .and_then(|c| c.exp)
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// An identity token without a readable `exp` counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.identity_expires_at() {
            Some(expiry) => now + Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS) >= expiry,
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.identity_expires_at()
            .map(|expiry| (expiry - Utc::now()).num_minutes().max(0))
            .unwrap_or(0)
    }
}

/// Decode the payload segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Build an unsigned JWT carrying `claims`. Used by the in-memory identity
/// provider, whose tokens are never sent to a verifying server.
pub(crate) fn encode_unsigned_token(claims: &TokenClaims) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = serde_json::to_vec(claims).unwrap_or_default();
    format!("{}.{}.unsigned", header, URL_SAFE_NO_PAD.encode(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_at(exp: i64) -> String {
        encode_unsigned_token(&TokenClaims {
            sub: Some("sub-1".to_string()),
            email: Some("ada@example.com".to_string()),
            exp: Some(exp),
            iat: Some(exp - 3600),
            token_use: Some("id".to_string()),
            jti: None,
        })
    }

    #[test]
    fn test_decode_claims_round_trip() {
        let token = token_expiring_at(1_900_000_000);
        let claims = decode_claims(&token).expect("claims should decode");
        assert_eq!(claims.sub.as_deref(), Some("sub-1"));
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn test_decode_claims_rejects_garbage() {
        assert!(decode_claims("").is_none());
        assert!(decode_claims("not-a-jwt").is_none());
        assert!(decode_claims("a.!!!.c").is_none());
        // Valid base64 but not JSON
        let not_json = format!("x.{}.y", URL_SAFE_NO_PAD.encode(b"plain text"));
        assert!(decode_claims(&not_json).is_none());
    }

    #[test]
    fn test_decode_claims_tolerates_padding() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"sub":"s","exp":5}"#);
        let token = format!("h.{}.sig", payload);
        assert_eq!(decode_claims(&token).and_then(|c| c.exp), Some(5));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let fresh = Session::new(token_expiring_at((now + Duration::hours(1)).timestamp()), "a", "r");
        assert!(!fresh.is_expired_at(now));
        assert!(fresh.minutes_until_expiry() >= 58);

        let stale = Session::new(token_expiring_at((now - Duration::minutes(1)).timestamp()), "a", "r");
        assert!(stale.is_expired_at(now));
        assert_eq!(stale.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_session_expiry_buffer() {
        let now = Utc::now();
        // Inside the buffer window: still valid on paper, but treated as expired
        let nearly = Session::new(token_expiring_at((now + Duration::seconds(30)).timestamp()), "a", "r");
        assert!(nearly.is_expired_at(now));
    }

    #[test]
    fn test_undecodable_token_is_expired() {
        let session = Session::new("opaque", "a", "r");
        assert!(session.is_expired());
        assert_eq!(session.identity_expires_at(), None);
    }

    #[test]
    fn test_is_complete() {
        assert!(Session::new("i", "a", "r").is_complete());
        assert!(!Session::new("i", "", "r").is_complete());
        assert!(!Session::new("", "a", "r").is_complete());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let token = token_expiring_at(1_900_000_000);
        let session = Session::new(token.clone(), "access-secret", "refresh-secret");
        let rendered = format!("{:?}", session);
        assert!(rendered.contains("sub-1"));
        assert!(!rendered.contains(&token));
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
    }
}
