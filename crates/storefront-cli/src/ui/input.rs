//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{
    can_add_password_char, can_add_username_char, App, AppState, LoginFocus, Tab,
    PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Ctrl+C quits from anywhere, including the login form
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.state = AppState::Quitting;
        return Ok(true);
    }

    // Handle login overlay
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
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

    if !matches!(app.state, AppState::Normal) {
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('L') => {
            app.logout();
            return Ok(false);
        }
        KeyCode::Char('1') => {
            app.navigate(Tab::Home);
            return Ok(false);
        }
        KeyCode::Char('2') => {
            app.navigate(Tab::Posts);
            return Ok(false);
        }
        KeyCode::Char('3') => {
            app.navigate(Tab::Logout);
            return Ok(false);
        }
        KeyCode::Tab | KeyCode::Right if app.detail.is_none() => {
            app.navigate(app.current_tab.next());
            return Ok(false);
        }
        KeyCode::BackTab | KeyCode::Left if app.detail.is_none() => {
            app.navigate(app.current_tab.prev());
            return Ok(false);
        }
        _ => {}
    }

    // Tab-specific keys
    match app.current_tab {
        Tab::Home => handle_home_input(app, key),
        Tab::Posts if app.detail.is_some() => handle_detail_input(app, key),
        Tab::Posts => handle_posts_input(app, key),
        Tab::Logout => handle_logout_input(app, key),
    }

    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            // Move to next field
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            // Move to previous field
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => {
                app.login_focus = LoginFocus::Password;
            }
            LoginFocus::Password | LoginFocus::Button => {
                // Failure leaves login_error set and the form open
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_home_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        app.navigate(Tab::Posts);
    }
}

fn handle_posts_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.select_next_post(1),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev_post(1),
        KeyCode::PageDown => app.select_next_post(PAGE_SCROLL_SIZE),
        KeyCode::PageUp => app.select_prev_post(PAGE_SCROLL_SIZE),
        KeyCode::Home | KeyCode::Char('g') => app.post_selection = 0,
        KeyCode::End | KeyCode::Char('G') => app.select_next_post(usize::MAX / 2),
        KeyCode::Enter => app.open_selected_post(),
        KeyCode::Char('r') => app.refresh_posts(),
        KeyCode::Char('c') => app.clear_posts(),
        _ => {}
    }
}

fn handle_detail_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => app.close_detail(),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
            if let Some(detail) = app.detail.as_mut() {
                detail.counter.increment();
            }
        }
        KeyCode::Char('-') | KeyCode::Down => {
            if let Some(detail) = app.detail.as_mut() {
                detail.counter.decrement();
            }
        }
        KeyCode::Char('r') => app.refresh_posts(),
        _ => {}
    }
}

fn handle_logout_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        app.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::app::PostDetail;
    use storefront_core::auth::MemoryStore;
    use storefront_core::config::Config;
    use storefront_core::Services;

    fn signed_in_app() -> App {
        let config = Config {
            auth_base_url: "http://127.0.0.1:9".to_string(),
            posts_base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let services =
            Services::with_store(&config, Arc::new(MemoryStore::with_token("saved"))).unwrap();
        let mut app = App::new(config, services);
        app.restore_session();
        app
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_number_keys_switch_tabs() {
        let mut app = signed_in_app();
        handle_input(&mut app, press(KeyCode::Char('3'))).await.unwrap();
        assert_eq!(app.current_tab, Tab::Logout);
        handle_input(&mut app, press(KeyCode::Char('1'))).await.unwrap();
        assert_eq!(app.current_tab, Tab::Home);
    }

    #[tokio::test]
    async fn test_detail_counter_keys() {
        let mut app = signed_in_app();
        app.current_tab = Tab::Posts;
        app.detail = Some(PostDetail::new(1));

        handle_input(&mut app, press(KeyCode::Char('+'))).await.unwrap();
        handle_input(&mut app, press(KeyCode::Char('+'))).await.unwrap();
        assert_eq!(app.detail.as_ref().unwrap().counter.value(), 3);

        for _ in 0..5 {
            handle_input(&mut app, press(KeyCode::Char('-'))).await.unwrap();
        }
        assert_eq!(app.detail.as_ref().unwrap().counter.value(), 0);

        handle_input(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert!(app.detail.is_none());
        assert_eq!(app.current_tab, Tab::Posts);
    }

    #[tokio::test]
    async fn test_enter_on_logout_tab_signs_out() {
        let mut app = signed_in_app();
        app.current_tab = Tab::Logout;

        handle_input(&mut app, press(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.state, AppState::LoggingIn);
        assert!(!app.session_state().is_authenticated());
    }

    #[tokio::test]
    async fn test_quit_needs_confirmation() {
        let mut app = signed_in_app();
        assert!(!handle_input(&mut app, press(KeyCode::Char('q'))).await.unwrap());
        assert_eq!(app.state, AppState::ConfirmingQuit);
        assert!(!handle_input(&mut app, press(KeyCode::Char('n'))).await.unwrap());
        assert_eq!(app.state, AppState::Normal);
        handle_input(&mut app, press(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, press(KeyCode::Char('y'))).await.unwrap());
    }

    #[tokio::test]
    async fn test_login_form_typing_respects_limits() {
        let mut app = signed_in_app();
        app.logout();
        app.login_username.clear();
        app.login_focus = LoginFocus::Username;

        for _ in 0..60 {
            handle_input(&mut app, press(KeyCode::Char('a'))).await.unwrap();
        }
        assert_eq!(app.login_username.len(), 50);

        handle_input(&mut app, press(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Password);
        handle_input(&mut app, press(KeyCode::Char('x'))).await.unwrap();
        handle_input(&mut app, press(KeyCode::Backspace)).await.unwrap();
        assert!(app.login_password.is_empty());
    }
}
