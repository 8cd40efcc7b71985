//! Application state management for quicknote.
//!
//! This module contains the core `App` struct: the sign-in form, the cached
//! message feed, the compose box, selection and swipe offsets, and the
//! status line. Every failure from the core ends up in `status_message` or
//! `login_error`; a failure that means the session is gone sends the user
//! back to the sign-in overlay.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use quicknote_core::auth::{AuthError, AuthForm, AuthMode, AuthOutcome};
use quicknote_core::models::{Message, MAX_MESSAGE_LENGTH};
use quicknote_core::{ApiClient, ApiError, Config, MessageFeed, SessionManager};

// ============================================================================
// Constants
// ============================================================================

/// Offset applied to the selected row per swipe step, in pixels.
pub const SWIPE_STEP: i32 = -25;

/// Offset at which a swipe deletes the row.
/// Four steps left from rest.
pub const SWIPE_DELETE_THRESHOLD: i32 = -100;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Composing,
    ShowingHelp,
    SigningIn,
    ConfirmingQuit,
    Quitting,
}

/// Sign-in form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Code,
    Button,
}

impl LoginFocus {
    /// Fields shown for a form mode, in tab order.
    pub fn fields(mode: AuthMode) -> &'static [LoginFocus] {
        match mode {
            AuthMode::SignIn | AuthMode::SignUp => {
                &[LoginFocus::Email, LoginFocus::Password, LoginFocus::Button]
            }
            AuthMode::Confirm => &[LoginFocus::Email, LoginFocus::Code, LoginFocus::Button],
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    /// Where `config` is written back; `None` keeps it in memory only.
    config_path: Option<PathBuf>,
    pub sessions: Arc<SessionManager>,
    pub api: ApiClient,
    pub feed: MessageFeed,

    // UI State
    pub state: AppState,
    pub user_email: Option<String>,
    pub compose: String,
    pub selection: usize,
    /// Horizontal drag offset per message id. Rows at rest have no entry.
    pub swipe_offsets: HashMap<i64, i32>,
    pub status_message: Option<String>,

    // Sign-in form state
    pub auth_form: AuthForm,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
}

impl App {
    pub fn new(config: Config, sessions: Arc<SessionManager>) -> Result<Self> {
        let api = ApiClient::new(config.api_url.clone(), sessions.clone())
            .context("Failed to create API client")?;
        let auth_form = AuthForm::new(config.last_email.clone().unwrap_or_default());
        Ok(Self {
            config,
            config_path: None,
            sessions,
            api,
            feed: MessageFeed::new(),

            state: AppState::Normal,
            user_email: None,
            compose: String::new(),
            selection: 0,
            swipe_offsets: HashMap::new(),
            status_message: None,

            auth_form,
            login_focus: LoginFocus::Email,
            login_error: None,
        })
    }

    /// Build the app from the configured identity pool, session cache and
    /// message server. Config changes are saved back to the config file.
    pub fn from_config(config: Config) -> Result<Self> {
        let sessions = Arc::new(config.session_manager()?);
        debug!(api_url = %config.api_url, region = %config.region(), "App configured");

        let mut app = Self::new(config, sessions)?;
        app.config_path = Some(Config::config_path()?);
        Ok(app)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Resume a cached session if there is a usable one.
    pub async fn resume_session(&mut self) -> bool {
        let result = self.sessions.current_session().await;
        match result {
            Ok(Some(session)) => {
                self.user_email = session.email();
                self.load_profile().await;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read cached session");
                self.status_message = Some(e.user_message());
                false
            }
        }
    }

    /// Show the sign-in overlay
    pub fn start_sign_in(&mut self) {
        self.state = AppState::SigningIn;
        self.login_focus = if self.auth_form.email.is_empty() {
            LoginFocus::Email
        } else if self.auth_form.mode == AuthMode::Confirm {
            LoginFocus::Code
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Switch the form between sign-in and sign-up.
    pub fn toggle_auth_mode(&mut self) {
        self.auth_form.toggle_mode();
        self.login_error = None;
        if !LoginFocus::fields(self.auth_form.mode).contains(&self.login_focus) {
            self.login_focus = LoginFocus::Email;
        }
    }

    pub fn next_login_focus(&mut self) {
        self.login_focus = Self::step_focus(self.auth_form.mode, self.login_focus, 1);
    }

    pub fn prev_login_focus(&mut self) {
        self.login_focus = Self::step_focus(self.auth_form.mode, self.login_focus, -1);
    }

    fn step_focus(mode: AuthMode, current: LoginFocus, step: isize) -> LoginFocus {
        let fields = LoginFocus::fields(mode);
        let len = fields.len() as isize;
        let index = fields.iter().position(|f| *f == current).unwrap_or(0) as isize;
        fields[(index + step).rem_euclid(len) as usize]
    }

    /// Submit the sign-in form in its current mode.
    pub async fn submit_auth(&mut self) {
        self.login_error = None;
        let result = self.auth_form.submit(&self.sessions).await;
        match result {
            Ok(AuthOutcome::Registered) => {
                self.login_focus = LoginFocus::Code;
                self.login_error = Some("Check your email for a confirmation code".to_string());
            }
            Ok(AuthOutcome::Confirmed) => {
                self.login_focus = LoginFocus::Password;
                self.login_error = Some("Email confirmed. Sign in to continue".to_string());
            }
            Ok(AuthOutcome::SignedIn(session)) => {
                self.user_email = session.email().or_else(|| Some(self.auth_form.email.clone()));
                self.remember_email();
                self.state = AppState::Normal;
                info!("Sign-in complete");
                self.load_profile().await;
                self.refresh().await;
            }
            Err(e @ AuthError::NotConfirmed(_)) => {
                warn!(error = %e, "Sign-in to an unconfirmed account");
                self.login_focus = LoginFocus::Code;
                self.login_error =
                    Some("Account not confirmed. Enter the code from your email".to_string());
            }
            Err(e) => {
                warn!(error = %e, mode = ?self.auth_form.mode, "Sign-in form submit failed");
                self.login_error = Some(e.user_message());
            }
        }
    }

    /// Show the account as the server knows it. The token's email stays in
    /// the title bar if the server can't be asked.
    async fn load_profile(&mut self) {
        let result = self.api.current_user().await;
        match result {
            Ok(user) => {
                debug!(user_id = user.id, "Loaded profile");
                self.user_email = Some(user.display_name().to_string());
            }
            Err(e) => debug!(error = %e, "Failed to load profile"),
        }
    }

    fn remember_email(&mut self) {
        let email = self.auth_form.email.trim().to_string();
        if self.config.last_email.as_deref() == Some(email.as_str()) {
            return;
        }
        self.config.last_email = Some(email);
        if let Some(ref path) = self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "Failed to save config");
            }
        }
    }

    pub async fn sign_out(&mut self) {
        if let Err(e) = self.sessions.sign_out().await {
            warn!(error = %e, "Failed to clear session");
            self.status_message = Some(e.user_message());
            return;
        }
        self.feed.clear();
        self.swipe_offsets.clear();
        self.selection = 0;
        self.user_email = None;
        self.status_message = None;
        self.start_sign_in();
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub async fn refresh(&mut self) {
        let result = self.feed.refresh(&self.api).await;
        match result {
            Ok(()) => {
                self.swipe_offsets
                    .retain(|id, _| self.feed.iter().any(|m| m.id == *id));
                self.clamp_selection();
                self.status_message = None;
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn start_compose(&mut self) {
        self.state = AppState::Composing;
    }

    pub fn cancel_compose(&mut self) {
        self.state = AppState::Normal;
    }

    /// Append a character to the compose box, up to the message length limit.
    pub fn push_compose_char(&mut self, c: char) {
        if !c.is_control() && self.compose.chars().count() < MAX_MESSAGE_LENGTH {
            self.compose.push(c);
        }
    }

    /// Send the compose box. The text is kept if the send fails.
    pub async fn submit_compose(&mut self) {
        let result = self.feed.create(&self.api, &self.compose).await;
        match result {
            Ok(created) => {
                debug!(id = created.id, "Message created");
                self.compose.clear();
                self.state = AppState::Normal;
                self.selection = self
                    .feed
                    .iter()
                    .position(|m| m.id == created.id)
                    .unwrap_or(0);
                self.status_message = Some("Message saved".to_string());
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn selected_message(&self) -> Option<&Message> {
        self.feed.get(self.selection)
    }

    pub fn select_next(&mut self, step: usize) {
        if !self.feed.is_empty() {
            self.selection = (self.selection + step).min(self.feed.len() - 1);
        }
    }

    pub fn select_prev(&mut self, step: usize) {
        self.selection = self.selection.saturating_sub(step);
    }

    fn clamp_selection(&mut self) {
        self.selection = self.selection.min(self.feed.len().saturating_sub(1));
    }

    /// Delete the selected message. It leaves the list at once and stays
    /// gone even if the server refuses.
    pub async fn delete_selected(&mut self) {
        let Some(id) = self.selected_message().map(|m| m.id) else {
            return;
        };
        self.swipe_offsets.remove(&id);
        let result = self.feed.delete(&self.api, id).await;
        self.clamp_selection();
        match result {
            Ok(()) => self.status_message = Some("Message deleted".to_string()),
            Err(e) => self.report_error(e),
        }
    }

    /// Current swipe offset of a message; zero at rest.
    pub fn swipe_offset(&self, id: i64) -> i32 {
        self.swipe_offsets.get(&id).copied().unwrap_or(0)
    }

    /// Drag the selected row one step left. Reaching the threshold deletes it.
    pub async fn swipe_left(&mut self) {
        let Some(id) = self.selected_message().map(|m| m.id) else {
            return;
        };
        let offset = self.swipe_offset(id) + SWIPE_STEP;
        if offset <= SWIPE_DELETE_THRESHOLD {
            self.delete_selected().await;
        } else {
            self.swipe_offsets.insert(id, offset);
        }
    }

    /// Let go of the selected row; it snaps back to rest.
    pub fn swipe_reset(&mut self) {
        if let Some(id) = self.selected_message().map(|m| m.id) {
            self.swipe_offsets.remove(&id);
        }
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Surface an error. Errors that mean the session is gone send the
    /// user back to sign in.
    pub fn report_error(&mut self, err: ApiError) {
        warn!(error = %err, "Request failed");
        if err.requires_sign_in() {
            self.user_email = None;
            self.start_sign_in();
            self.login_error = Some("Session expired. Please sign in again.".to_string());
        } else {
            self.status_message = Some(err.user_message());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use quicknote_core::auth::{MemoryIdentityProvider, MemorySessionProvider};

    use super::*;

    pub(crate) const EMAIL: &str = "ada@example.com";
    pub(crate) const PASSWORD: &str = "Analytical1";

    const TWO_MESSAGES: &str = r#"{"messages": [
        {"id": 2, "message": "second", "created_at": "2024-03-02 09:00:00"},
        {"id": 1, "message": "first", "created_at": "2024-03-01 09:00:00"}
    ]}"#;

    /// App talking to `server_url` with an in-memory pool and no session.
    pub(crate) fn test_app(server_url: &str) -> (App, Arc<MemoryIdentityProvider>) {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let sessions = Arc::new(SessionManager::new(
            provider.clone(),
            Arc::new(MemorySessionProvider::new()),
        ));
        let config = Config {
            api_url: server_url.to_string(),
            ..Config::default()
        };
        (App::new(config, sessions).unwrap(), provider)
    }

    async fn signed_in_app(server: &mockito::ServerGuard) -> App {
        let (app, provider) = test_app(&server.url());
        let sessions = &app.sessions;
        sessions.register(EMAIL, PASSWORD).await.unwrap();
        let code = provider.pending_code(EMAIL).await.unwrap();
        sessions.confirm(EMAIL, &code).await.unwrap();
        sessions.authenticate(EMAIL, PASSWORD).await.unwrap();
        app
    }

    async fn loaded_app(server: &mut mockito::ServerGuard) -> App {
        server
            .mock("GET", "/messages")
            .with_status(200)
            .with_body(TWO_MESSAGES)
            .create_async()
            .await;
        let mut app = signed_in_app(server).await;
        app.refresh().await;
        assert_eq!(app.feed.len(), 2);
        app
    }

    // ---- Sign-in Tests ----

    #[tokio::test]
    async fn test_sign_up_confirm_sign_in_flow() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/messages")
            .with_status(200)
            .with_body(TWO_MESSAGES)
            .create_async()
            .await;
        let (mut app, provider) = test_app(&server.url());

        app.start_sign_in();
        app.toggle_auth_mode();
        assert_eq!(app.auth_form.mode, AuthMode::SignUp);
        app.auth_form.email = EMAIL.to_string();
        app.auth_form.password = PASSWORD.to_string();

        app.submit_auth().await;
        assert_eq!(app.auth_form.mode, AuthMode::Confirm);
        assert_eq!(app.login_focus, LoginFocus::Code);

        app.auth_form.code = provider.pending_code(EMAIL).await.unwrap();
        app.submit_auth().await;
        assert_eq!(app.auth_form.mode, AuthMode::SignIn);
        assert_eq!(app.login_focus, LoginFocus::Password);

        app.auth_form.password = PASSWORD.to_string();
        app.submit_auth().await;
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.user_email.as_deref(), Some(EMAIL));
        assert_eq!(app.config.last_email.as_deref(), Some(EMAIL));
        assert_eq!(app.feed.len(), 2);
        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_wrong_password_stays_on_form() {
        let server = mockito::Server::new_async().await;
        let mut app = signed_in_app(&server).await;
        app.sessions.sign_out().await.unwrap();

        app.start_sign_in();
        app.auth_form.email = EMAIL.to_string();
        app.auth_form.password = "WrongPass1".to_string();
        app.submit_auth().await;

        assert_eq!(app.state, AppState::SigningIn);
        assert!(app.login_error.is_some());
    }

    #[tokio::test]
    async fn test_resume_session() {
        let server = mockito::Server::new_async().await;
        let mut app = signed_in_app(&server).await;
        assert!(app.resume_session().await);
        assert_eq!(app.user_email.as_deref(), Some(EMAIL));

        let (mut fresh, _) = test_app(&server.url());
        assert!(!fresh.resume_session().await);
    }

    #[tokio::test]
    async fn test_resume_shows_server_profile() {
        let mut server = mockito::Server::new_async().await;
        let me = server
            .mock("GET", "/auth/me")
            .with_status(200)
            .with_body(r#"{"id": 7, "email": null, "cognito_sub": "sub-77aa"}"#)
            .create_async()
            .await;
        let mut app = signed_in_app(&server).await;

        assert!(app.resume_session().await);
        assert_eq!(app.user_email.as_deref(), Some("sub-77aa"));
        me.assert_async().await;
    }

    #[tokio::test]
    async fn test_confirm_account_registered_in_earlier_run() {
        let server = mockito::Server::new_async().await;
        let provider = Arc::new(MemoryIdentityProvider::new());
        let store = Arc::new(MemorySessionProvider::new());
        let first_run = Arc::new(SessionManager::new(provider.clone(), store.clone()));
        first_run.register(EMAIL, PASSWORD).await.unwrap();

        // Quit before entering the code, then start again
        let sessions = Arc::new(SessionManager::new(provider.clone(), store));
        let config = Config {
            api_url: server.url(),
            ..Config::default()
        };
        let mut app = App::new(config, sessions).unwrap();
        app.start_sign_in();
        app.auth_form.email = EMAIL.to_string();
        app.auth_form.password = PASSWORD.to_string();

        app.submit_auth().await;
        assert_eq!(app.state, AppState::SigningIn);
        assert_eq!(app.auth_form.mode, AuthMode::Confirm);
        assert_eq!(app.login_focus, LoginFocus::Code);
        assert!(app.login_error.is_some());

        app.auth_form.code = provider.pending_code(EMAIL).await.unwrap();
        app.submit_auth().await;
        assert_eq!(app.auth_form.mode, AuthMode::SignIn);

        app.submit_auth().await;
        assert_eq!(app.state, AppState::Normal);
        assert!(app.sessions.current_session().await.unwrap().is_some());
    }

    #[test]
    fn test_login_focus_cycles_per_mode() {
        let (mut app, _) = test_app("http://localhost:8000");
        app.login_focus = LoginFocus::Button;
        app.next_login_focus();
        assert_eq!(app.login_focus, LoginFocus::Email);
        app.prev_login_focus();
        assert_eq!(app.login_focus, LoginFocus::Button);
        app.prev_login_focus();
        assert_eq!(app.login_focus, LoginFocus::Password);

        app.auth_form.mode = AuthMode::Confirm;
        app.login_focus = LoginFocus::Email;
        app.next_login_focus();
        assert_eq!(app.login_focus, LoginFocus::Code);
    }

    // ---- Session Loss Tests ----

    #[tokio::test]
    async fn test_no_session_returns_to_sign_in() {
        let mut server = mockito::Server::new_async().await;
        let any = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let (mut app, _) = test_app(&server.url());

        app.refresh().await;
        assert_eq!(app.state, AppState::SigningIn);
        assert!(app.login_error.is_some());
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_token_returns_to_sign_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/messages")
            .with_status(401)
            .create_async()
            .await;
        let mut app = signed_in_app(&server).await;

        app.refresh().await;
        assert_eq!(app.state, AppState::SigningIn);
    }

    #[tokio::test]
    async fn test_sign_out_clears_feed() {
        let mut server = mockito::Server::new_async().await;
        let mut app = loaded_app(&mut server).await;

        app.sign_out().await;
        assert!(app.feed.is_empty());
        assert_eq!(app.state, AppState::SigningIn);
        assert_eq!(app.sessions.current_session().await.unwrap(), None);
    }

    // ---- Compose Tests ----

    #[tokio::test]
    async fn test_blank_compose_rejected_locally() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/messages")
            .expect(0)
            .create_async()
            .await;
        let mut app = signed_in_app(&server).await;

        app.start_compose();
        app.compose = "   ".to_string();
        app.submit_compose().await;

        assert_eq!(app.state, AppState::Composing);
        assert!(app.status_message.is_some());
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_compose_creates_and_selects() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"id": 2, "message": "second", "created_at": "2024-03-02 09:00:00"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/messages")
            .with_status(200)
            .with_body(TWO_MESSAGES)
            .create_async()
            .await;
        let mut app = signed_in_app(&server).await;

        app.start_compose();
        for c in "second".chars() {
            app.push_compose_char(c);
        }
        app.submit_compose().await;

        assert_eq!(app.state, AppState::Normal);
        assert!(app.compose.is_empty());
        assert_eq!(app.selected_message().map(|m| m.id), Some(2));
    }

    #[test]
    fn test_compose_length_limit() {
        let (mut app, _) = test_app("http://localhost:8000");
        for _ in 0..MAX_MESSAGE_LENGTH + 10 {
            app.push_compose_char('x');
        }
        app.push_compose_char('\n');
        assert_eq!(app.compose.chars().count(), MAX_MESSAGE_LENGTH);
    }

    // ---- Swipe Tests ----

    #[tokio::test]
    async fn test_swipe_to_threshold_deletes() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("DELETE", "/messages/2")
            .with_status(200)
            .with_body(r#"{"deleted": true, "id": 2}"#)
            .expect(1)
            .create_async()
            .await;
        let mut app = loaded_app(&mut server).await;

        for expected in [-25, -50, -75] {
            app.swipe_left().await;
            assert_eq!(app.swipe_offset(2), expected);
        }
        assert_eq!(app.feed.len(), 2);

        app.swipe_left().await;
        assert_eq!(app.feed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(app.swipe_offset(2), 0);
        assert_eq!(app.selection, 0);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_swipe_reset() {
        let mut server = mockito::Server::new_async().await;
        let mut app = loaded_app(&mut server).await;

        app.swipe_left().await;
        app.swipe_left().await;
        assert_eq!(app.swipe_offset(2), -50);

        app.swipe_reset();
        assert_eq!(app.swipe_offset(2), 0);
        assert_eq!(app.feed.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_row_removed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/messages/1")
            .with_status(404)
            .with_body(r#"{"detail": "Message not found"}"#)
            .create_async()
            .await;
        let mut app = loaded_app(&mut server).await;

        app.select_next(1);
        app.delete_selected().await;

        assert_eq!(app.feed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(app.selection, 0);
        assert_eq!(app.status_message.as_deref(), Some("Message not found"));
        assert_eq!(app.state, AppState::Normal);
    }
}
