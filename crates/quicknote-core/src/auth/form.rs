//! Client-local state of the sign-in / sign-up / confirm form.

use super::{AuthError, Session, SessionManager};

/// Maximum length for email input (RFC 5321 path limit).
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for confirmation code input.
const MAX_CODE_LENGTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
    Confirm,
}

impl AuthMode {
    pub fn title(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "Sign In",
            AuthMode::SignUp => "Sign Up",
            AuthMode::Confirm => "Confirm Email",
        }
    }
}

/// What a successful submit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Account created; the form now asks for the emailed code.
    Registered,
    /// Account confirmed; the form is back in sign-in mode.
    Confirmed,
    /// Signed in; the session is already cached by the manager.
    SignedIn(Session),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub code: String,
}

impl AuthForm {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::SignIn,
            email: email.into(),
            password: String::new(),
            code: String::new(),
        }
    }

    /// Switch between sign-in and sign-up. Leaving the confirm step goes
    /// back to sign-in.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp | AuthMode::Confirm => AuthMode::SignIn,
        };
        self.code.clear();
    }

    /// The fields the current mode needs, if any are empty.
    pub fn missing_fields(&self) -> Option<&'static str> {
        let email_missing = self.email.trim().is_empty();
        match self.mode {
            AuthMode::SignIn | AuthMode::SignUp if email_missing || self.password.is_empty() => {
                Some("Email and password required")
            }
            AuthMode::Confirm if email_missing || self.code.trim().is_empty() => {
                Some("Email and confirmation code required")
            }
            _ => None,
        }
    }

    /// Run the operation for the current mode and advance the form.
    ///
    /// On failure the mode and fields are left untouched so the user can
    /// correct them and resubmit. The exception is signing in to an account
    /// that was never confirmed, which moves the form to the confirm step.
    pub async fn submit(&mut self, sessions: &SessionManager) -> Result<AuthOutcome, AuthError> {
        if let Some(missing) = self.missing_fields() {
            let msg = missing.to_string();
            return Err(match self.mode {
                AuthMode::SignIn => AuthError::Authentication(msg),
                AuthMode::SignUp => AuthError::Registration(msg),
                AuthMode::Confirm => AuthError::Confirmation(msg),
            });
        }

        match self.mode {
            AuthMode::SignUp => {
                sessions.register(&self.email, &self.password).await?;
                self.mode = AuthMode::Confirm;
                Ok(AuthOutcome::Registered)
            }
            AuthMode::Confirm => {
                sessions.confirm(&self.email, &self.code).await?;
                self.code.clear();
                self.mode = AuthMode::SignIn;
                Ok(AuthOutcome::Confirmed)
            }
            AuthMode::SignIn => {
                let result = sessions.authenticate(&self.email, &self.password).await;
                match result {
                    Ok(session) => {
                        self.password.clear();
                        Ok(AuthOutcome::SignedIn(session))
                    }
                    Err(e @ AuthError::NotConfirmed(_)) => {
                        // Registered earlier but never confirmed; ask for the code.
                        self.mode = AuthMode::Confirm;
                        self.code.clear();
                        Err(e)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    pub fn push_email_char(&mut self, c: char) -> bool {
        push_if(&mut self.email, c, can_add_email_char)
    }

    pub fn push_password_char(&mut self, c: char) -> bool {
        push_if(&mut self.password, c, can_add_password_char)
    }

    pub fn push_code_char(&mut self, c: char) -> bool {
        push_if(&mut self.code, c, can_add_code_char)
    }
}

fn push_if(field: &mut String, c: char, allowed: fn(usize, char) -> bool) -> bool {
    if allowed(field.chars().count(), c) {
        field.push(c);
        true
    } else {
        false
    }
}

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Check if a confirmation code character should be accepted
pub fn can_add_code_char(current_len: usize, c: char) -> bool {
    current_len < MAX_CODE_LENGTH && c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{MemoryIdentityProvider, MemorySessionProvider};

    const EMAIL: &str = "ada@example.com";
    const PASSWORD: &str = "Analytical1";

    fn manager() -> (Arc<MemoryIdentityProvider>, SessionManager) {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let manager = SessionManager::new(provider.clone(), Arc::new(MemorySessionProvider::new()));
        (provider, manager)
    }

    fn filled(mode: AuthMode) -> AuthForm {
        AuthForm {
            mode,
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
            code: String::new(),
        }
    }

    #[test]
    fn test_toggle_mode() {
        let mut form = AuthForm::new("");
        assert_eq!(form.mode, AuthMode::SignIn);
        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::SignUp);
        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::SignIn);

        form.mode = AuthMode::Confirm;
        form.code = "123".to_string();
        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::SignIn);
        assert!(form.code.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        assert!(AuthForm::new("").missing_fields().is_some());
        assert!(filled(AuthMode::SignIn).missing_fields().is_none());
        assert!(filled(AuthMode::SignUp).missing_fields().is_none());

        let mut confirm = filled(AuthMode::Confirm);
        assert_eq!(
            confirm.missing_fields(),
            Some("Email and confirmation code required")
        );
        confirm.code = "123456".to_string();
        assert!(confirm.missing_fields().is_none());
    }

    #[tokio::test]
    async fn test_full_sign_up_flow() {
        let (provider, sessions) = manager();
        let mut form = filled(AuthMode::SignUp);

        assert_eq!(form.submit(&sessions).await.unwrap(), AuthOutcome::Registered);
        assert_eq!(form.mode, AuthMode::Confirm);
        assert_eq!(form.email, EMAIL);

        form.code = provider.pending_code(EMAIL).await.unwrap();
        assert_eq!(form.submit(&sessions).await.unwrap(), AuthOutcome::Confirmed);
        assert_eq!(form.mode, AuthMode::SignIn);
        assert!(form.code.is_empty());

        // Password survives confirmation so sign-in is one more submit
        match form.submit(&sessions).await.unwrap() {
            AuthOutcome::SignedIn(session) => assert!(session.is_complete()),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(form.password.is_empty());
        assert!(sessions.current_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_mode() {
        let (_, sessions) = manager();
        let mut form = filled(AuthMode::SignIn);

        let err = form.submit(&sessions).await.unwrap_err();
        assert!(matches!(err, AuthError::Authentication(_)));
        assert_eq!(form.mode, AuthMode::SignIn);
        assert_eq!(form.password, PASSWORD);

        let mut confirm = filled(AuthMode::Confirm);
        confirm.code = "999999".to_string();
        let err = confirm.submit(&sessions).await.unwrap_err();
        assert!(matches!(err, AuthError::Confirmation(_)));
        assert_eq!(confirm.mode, AuthMode::Confirm);
    }

    #[tokio::test]
    async fn test_sign_in_to_unconfirmed_account_asks_for_code() {
        let (provider, sessions) = manager();
        sessions.register(EMAIL, PASSWORD).await.unwrap();

        // A later run: the form starts in sign-in mode
        let mut form = filled(AuthMode::SignIn);
        let err = form.submit(&sessions).await.unwrap_err();
        assert!(matches!(err, AuthError::NotConfirmed(_)));
        assert_eq!(form.mode, AuthMode::Confirm);
        assert_eq!(form.email, EMAIL);
        assert_eq!(form.password, PASSWORD);

        form.code = provider.pending_code(EMAIL).await.unwrap();
        assert_eq!(form.submit(&sessions).await.unwrap(), AuthOutcome::Confirmed);
        assert!(matches!(
            form.submit(&sessions).await.unwrap(),
            AuthOutcome::SignedIn(_)
        ));
    }

    #[tokio::test]
    async fn test_submit_with_missing_fields() {
        let (_, sessions) = manager();
        let mut form = AuthForm::new(EMAIL);
        form.mode = AuthMode::SignUp;

        let err = form.submit(&sessions).await.unwrap_err();
        assert!(matches!(err, AuthError::Registration(msg) if msg == "Email and password required"));
    }

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char(0, 'a'));
        assert!(can_add_email_char(253, '@'));
        assert!(!can_add_email_char(254, 'a'));
        assert!(!can_add_email_char(0, ' '));
        assert!(!can_add_email_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(can_add_password_char(0, ' '));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\x00'));
        assert!(!can_add_password_char(0, '\r'));
    }

    #[test]
    fn test_code_input() {
        let mut form = AuthForm::new(EMAIL);
        assert!(form.push_code_char('1'));
        assert!(!form.push_code_char('a'));
        for _ in 0..9 {
            form.push_code_char('9');
        }
        assert_eq!(form.code.len(), 10);
        assert!(!form.push_code_char('9'));
    }
}
