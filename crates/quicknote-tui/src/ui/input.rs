//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppState, LoginFocus, PAGE_SCROLL_SIZE};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::SigningIn => return handle_login_input(app, key).await,
        AppState::Composing => {
            handle_compose_input(app, key).await;
            return Ok(false);
        }
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('n') => app.start_compose(),
        KeyCode::Char('r') => app.refresh().await,
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected().await,
        KeyCode::Char('o') => app.sign_out().await,
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(1),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(1),
        KeyCode::PageUp => app.select_prev(PAGE_SCROLL_SIZE),
        KeyCode::PageDown => app.select_next(PAGE_SCROLL_SIZE),
        KeyCode::Home => app.selection = 0,
        KeyCode::End => {
            let len = app.feed.len();
            app.select_next(len);
        }
        KeyCode::Left => app.swipe_left().await,
        KeyCode::Right | KeyCode::Esc => app.swipe_reset(),
        _ => {}
    }
    Ok(false)
}

async fn handle_compose_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_compose(),
        KeyCode::Enter => app.submit_compose().await,
        KeyCode::Backspace => {
            app.compose.pop();
        }
        KeyCode::Char(c) => app.push_compose_char(c),
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.toggle_auth_mode();
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc => {
            // Quit if on sign-in screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => app.next_login_focus(),
        KeyCode::Up | KeyCode::BackTab => app.prev_login_focus(),
        KeyCode::Enter => {
            if app.login_focus == LoginFocus::Button {
                app.submit_auth().await;
            } else {
                app.next_login_focus();
            }
        }
        KeyCode::Backspace => {
            let form = &mut app.auth_form;
            match app.login_focus {
                LoginFocus::Email => {
                    form.email.pop();
                }
                LoginFocus::Password => {
                    form.password.pop();
                }
                LoginFocus::Code => {
                    form.code.pop();
                }
                LoginFocus::Button => {}
            }
        }
        KeyCode::Char(c) => {
            let form = &mut app.auth_form;
            match app.login_focus {
                LoginFocus::Email => {
                    form.push_email_char(c);
                }
                LoginFocus::Password => {
                    form.push_password_char(c);
                }
                LoginFocus::Code => {
                    form.push_code_char(c);
                }
                LoginFocus::Button => {}
            }
        }
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use quicknote_core::auth::AuthMode;

    use super::*;
    use crate::app::tests::test_app;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_quit_requires_confirmation() {
        let (mut app, _) = test_app("http://localhost:8000");

        assert!(!handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap());
        assert_eq!(app.state, AppState::ConfirmingQuit);

        assert!(!handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap());
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, key(KeyCode::Char('y'))).await.unwrap());
        assert_eq!(app.state, AppState::Quitting);
    }

    #[tokio::test]
    async fn test_ctrl_s_toggles_sign_up() {
        let (mut app, _) = test_app("http://localhost:8000");
        app.start_sign_in();

        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        handle_input(&mut app, ctrl_s).await.unwrap();
        assert_eq!(app.auth_form.mode, AuthMode::SignUp);
        assert!(app.auth_form.email.is_empty());

        handle_input(&mut app, ctrl_s).await.unwrap();
        assert_eq!(app.auth_form.mode, AuthMode::SignIn);
    }

    #[tokio::test]
    async fn test_login_typing_goes_to_focused_field() {
        let (mut app, _) = test_app("http://localhost:8000");
        app.start_sign_in();
        assert_eq!(app.login_focus, LoginFocus::Email);

        for c in "ada@example.com".chars() {
            handle_input(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Password);
        handle_input(&mut app, key(KeyCode::Char('s'))).await.unwrap();
        handle_input(&mut app, key(KeyCode::Backspace)).await.unwrap();
        handle_input(&mut app, key(KeyCode::Char('x'))).await.unwrap();

        assert_eq!(app.auth_form.email, "ada@example.com");
        assert_eq!(app.auth_form.password, "x");
    }

    #[tokio::test]
    async fn test_compose_mode_captures_keys() {
        let (mut app, _) = test_app("http://localhost:8000");

        handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap();
        assert_eq!(app.state, AppState::Composing);

        // 'q' is text while composing
        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert_eq!(app.compose, "q");
        assert_eq!(app.state, AppState::Composing);

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.compose, "q");
    }

    #[tokio::test]
    async fn test_help_overlay() {
        let (mut app, _) = test_app("http://localhost:8000");
        handle_input(&mut app, key(KeyCode::Char('?'))).await.unwrap();
        assert_eq!(app.state, AppState::ShowingHelp);
        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.state, AppState::Normal);
    }
}
