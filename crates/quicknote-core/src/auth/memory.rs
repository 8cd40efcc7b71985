//! In-process identity provider.
//!
//! Models the account lifecycle of a managed user pool without any network:
//! accounts register unconfirmed, receive a six digit code, and can only
//! sign in once confirmed. Tokens are unsigned JWTs with real `exp` claims so
//! session expiry and refresh behave as they do against Cognito.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use super::session::{encode_unsigned_token, TokenClaims};
use super::{AuthError, IdentityProvider, Session};

/// Identity token lifetime, matching the pool's one hour token validity.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Password policy of the user pool.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Account state as observed through provider operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Unregistered,
    Unconfirmed,
    Confirmed,
}

struct Account {
    sub: String,
    password: String,
    /// Pending confirmation code; `None` once confirmed.
    code: Option<String>,
}

#[derive(Default)]
struct PoolState {
    accounts: HashMap<String, Account>,
    /// Live refresh tokens, mapped to the account email.
    refresh_tokens: HashMap<String, String>,
}

pub struct MemoryIdentityProvider {
    state: Mutex<PoolState>,
    token_lifetime: Duration,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::with_token_lifetime(Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
    }

    /// Issue identity tokens with a custom lifetime. A zero or negative
    /// lifetime yields tokens that are already expired.
    pub fn with_token_lifetime(token_lifetime: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            token_lifetime,
        }
    }

    /// The code that would have been emailed to an unconfirmed account.
    pub async fn pending_code(&self, email: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .accounts
            .get(&normalize_email(email))
            .and_then(|a| a.code.clone())
    }

    pub async fn account_state(&self, email: &str) -> AccountState {
        let state = self.state.lock().await;
        match state.accounts.get(&normalize_email(email)) {
            None => AccountState::Unregistered,
            Some(account) if account.code.is_some() => AccountState::Unconfirmed,
            Some(_) => AccountState::Confirmed,
        }
    }

    /// Invalidate every refresh token issued so far.
    pub async fn revoke_refresh_tokens(&self) {
        self.state.lock().await.refresh_tokens.clear();
    }

    fn issue_token(&self, email: &str, sub: &str, token_use: &str) -> String {
        let now = Utc::now();
        encode_unsigned_token(&TokenClaims {
            sub: Some(sub.to_string()),
            email: Some(email.to_string()),
            exp: Some((now + self.token_lifetime).timestamp()),
            iat: Some(now.timestamp()),
            token_use: Some(token_use.to_string()),
            jti: Some(random_hex()),
        })
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        validate_email(&email).map_err(AuthError::Registration)?;
        check_password_policy(password).map_err(AuthError::Registration)?;

        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&email) {
            return Err(AuthError::Registration(
                "An account with the given email already exists.".to_string(),
            ));
        }

        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        debug!(%email, "Registered unconfirmed account");
        state.accounts.insert(
            email,
            Account {
                sub: random_hex(),
                password: password.to_string(),
                code: Some(code),
            },
        );
        Ok(())
    }

    async fn confirm(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&normalize_email(email))
            .ok_or_else(|| AuthError::Confirmation("Username/client id combination not found.".to_string()))?;

        let code_matches = match account.code.as_deref() {
            None => {
                return Err(AuthError::Confirmation(
                    "User cannot be confirmed. Current status is CONFIRMED".to_string(),
                ))
            }
            Some(expected) => expected == code.trim(),
        };
        if !code_matches {
            return Err(AuthError::Confirmation(
                "Invalid verification code provided, please try again.".to_string(),
            ));
        }

        account.code = None;
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let mut state = self.state.lock().await;

        let sub = match state.accounts.get(&email) {
            Some(account) if account.password == password => {
                if account.code.is_some() {
                    return Err(AuthError::NotConfirmed("User is not confirmed.".to_string()));
                }
                account.sub.clone()
            }
            _ => {
                return Err(AuthError::Authentication(
                    "Incorrect username or password.".to_string(),
                ))
            }
        };

        let refresh_token = format!("refresh-{}", random_hex());
        state.refresh_tokens.insert(refresh_token.clone(), email.clone());

        Ok(Session::new(
            self.issue_token(&email, &sub, "id"),
            self.issue_token(&email, &sub, "access"),
            refresh_token,
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let state = self.state.lock().await;
        let email = state
            .refresh_tokens
            .get(refresh_token)
            .ok_or_else(|| AuthError::Authentication("Invalid Refresh Token".to_string()))?;
        let account = state
            .accounts
            .get(email)
            .ok_or_else(|| AuthError::Authentication("User does not exist.".to_string()))?;

        Ok(Session::new(
            self.issue_token(email, &account.sub, "id"),
            self.issue_token(email, &account.sub, "access"),
            refresh_token,
        ))
    }
}

/// Check a password against the pool policy: minimum length plus at least
/// one lowercase letter, one uppercase letter and one digit.
pub fn check_password_policy(password: &str) -> Result<(), String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!("at least {} characters", MIN_PASSWORD_LENGTH));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        problems.push("a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        problems.push("an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("a number".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Password does not conform to policy: needs {}",
            problems.join(", ")
        ))
    }
}

fn validate_email(email: &str) -> Result<(), String> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err("Invalid email address format.".to_string()),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn random_hex() -> String {
    format!("{:016x}", rand::random::<u64>())
}
