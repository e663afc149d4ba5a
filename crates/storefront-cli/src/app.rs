//! Application state management for the storefront terminal client.
//!
//! This module contains the core `App` struct that holds UI state and drives
//! the session manager and post store from `storefront-core`. Rendering only
//! ever reads state through `App`; it never calls the network itself.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use storefront_core::api::describe_error;
use storefront_core::auth::{gate, Gate, SessionError, SessionManager, SessionState};
use storefront_core::cache::{CollectionSnapshot, CollectionStore, FetchOutcome};
use storefront_core::config::Config;
use storefront_core::models::Post;
use storefront_core::Services;

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Environment variables that prefill the login form
pub const ENV_USERNAME: &str = "STOREFRONT_USERNAME";
pub const ENV_PASSWORD: &str = "STOREFRONT_PASSWORD";

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs. All of them are behind the route gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Posts,
    Logout,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Home, Tab::Posts, Tab::Logout];

    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Posts => "Posts",
            Tab::Logout => "Logout",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Home => Tab::Posts,
            Tab::Posts => Tab::Logout,
            Tab::Logout => Tab::Home,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Home => Tab::Logout,
            Tab::Posts => Tab::Home,
            Tab::Logout => Tab::Posts,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Splash,
    LoggingIn,
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

/// Quantity picker on the post detail screen. Starts at 1, never below 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    value: u32,
}

impl Default for Counter {
    fn default() -> Self {
        Self { value: 1 }
    }
}

impl Counter {
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn increment(&mut self) {
        self.value = self.value.saturating_add(1);
    }

    pub fn decrement(&mut self) {
        self.value = self.value.saturating_sub(1);
    }
}

/// An open post detail view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDetail {
    pub post_id: i64,
    pub counter: Counter,
}

impl PostDetail {
    pub fn new(post_id: i64) -> Self {
        Self {
            post_id,
            counter: Counter::default(),
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub posts: Arc<CollectionStore<Post>>,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub post_selection: usize,
    pub detail: Option<PostDetail>,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Status message
    pub status_message: Option<String>,

    session_rx: watch::Receiver<SessionState>,
    pending_fetch: Option<JoinHandle<FetchOutcome>>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config, services: Services) -> Self {
        let login_username = std::env::var(ENV_USERNAME)
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let login_password = std::env::var(ENV_PASSWORD).unwrap_or_default();
        let session_rx = services.session.subscribe();

        Self {
            config,
            session: services.session,
            posts: services.posts,

            state: AppState::Splash,
            current_tab: Tab::Home,
            post_selection: 0,
            detail: None,

            login_username,
            login_password,
            login_focus: LoginFocus::Username,
            login_error: None,

            status_message: None,

            session_rx,
            pending_fetch: None,
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Restore the persisted session and leave the splash screen.
    pub fn restore_session(&mut self) {
        let restored = self.session.restore();
        debug!(restored, "Startup restore finished");
        self.state = AppState::Normal;
        self.enforce_gate();
    }

    /// Current session snapshot. Read fresh every time; never cached.
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Re-evaluate the route gate and bounce to the login form if needed.
    /// Returns whether protected content may render.
    pub fn enforce_gate(&mut self) -> bool {
        match gate(&self.session.state()) {
            Gate::Allow => true,
            Gate::RedirectToLogin => {
                if !matches!(self.state, AppState::LoggingIn | AppState::Quitting | AppState::Splash) {
                    self.start_login();
                }
                false
            }
        }
    }

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.detail = None;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        if let Err(message) = validate_login_form(&self.login_username, &self.login_password) {
            self.login_error = Some(message.clone());
            return Err(anyhow::anyhow!(message));
        }

        self.login_error = None;
        let username = self.login_username.trim().to_string();

        match self.session.login(&username, &self.login_password).await {
            Ok(()) => {
                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.login_password.clear();
                self.state = AppState::Normal;
                self.current_tab = Tab::Home;
                // The login itself changed the session; don't treat it as an outside change
                self.session_rx.mark_unchanged();
                info!("Login successful");
                Ok(())
            }
            Err(e) => {
                self.login_error = Some(login_error_message(&e));
                Err(e)
            }
        }
    }

    /// Sign out from any screen.
    pub fn logout(&mut self) {
        self.session.logout();
        self.session_rx.mark_unchanged();
        self.login_password.clear();
        self.status_message = None;
        self.start_login();
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Switch tabs, passing through the route gate.
    pub fn navigate(&mut self, tab: Tab) {
        if !self.enforce_gate() {
            return;
        }
        self.current_tab = tab;
        self.detail = None;
        if tab == Tab::Posts {
            self.ensure_posts_loaded();
        }
    }

    /// Open the detail view for the selected post in the list.
    pub fn open_selected_post(&mut self) {
        if !self.enforce_gate() {
            return;
        }
        let snapshot = self.posts.snapshot();
        if let Some(post) = snapshot.items.get(self.post_selection) {
            self.open_post(post.id);
        }
    }

    /// Open a post detail by id. Loads the feed first if it is empty.
    pub fn open_post(&mut self, post_id: i64) {
        if !self.enforce_gate() {
            return;
        }
        self.detail = Some(PostDetail::new(post_id));
        self.ensure_posts_loaded();
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// The post shown in the detail view, if it is in the store.
    pub fn detail_post(&self) -> Option<Post> {
        self.detail
            .as_ref()
            .and_then(|d| self.posts.get_by_id(d.post_id))
    }

    pub fn select_next_post(&mut self, step: usize) {
        let len = self.posts.snapshot().len();
        if len > 0 {
            self.post_selection = self.post_selection.saturating_add(step).min(len - 1);
        }
    }

    pub fn select_prev_post(&mut self, step: usize) {
        self.post_selection = self.post_selection.saturating_sub(step);
    }

    // =========================================================================
    // Post Feed
    // =========================================================================

    pub fn posts_snapshot(&self) -> CollectionSnapshot<Post> {
        self.posts.snapshot()
    }

    /// Whether a background fetch task is still running
    pub fn is_fetching(&self) -> bool {
        self.pending_fetch.is_some()
    }

    /// Kick off a background fetch if the feed is empty and none is running.
    pub fn ensure_posts_loaded(&mut self) {
        if !self.posts.snapshot().is_empty() || self.pending_fetch.is_some() {
            return;
        }
        let posts = Arc::clone(&self.posts);
        let ctx = self.session.request_context();
        debug!("Spawning post fetch");
        self.pending_fetch = Some(tokio::spawn(async move { posts.fetch_all(&ctx).await }));
    }

    /// Drop the cached feed and fetch it again.
    pub fn refresh_posts(&mut self) {
        if let Some(task) = self.pending_fetch.take() {
            // The store discards the old result on clear; this only stops the task early
            task.abort();
        }
        self.posts.clear();
        self.post_selection = 0;
        self.status_message = None;
        self.ensure_posts_loaded();
    }

    /// Empty the feed without refetching.
    pub fn clear_posts(&mut self) {
        self.posts.clear();
        self.post_selection = 0;
        self.status_message = Some("Posts cleared".to_string());
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    /// Check for completed background tasks and outside session changes
    pub async fn check_background_tasks(&mut self) {
        if self.pending_fetch.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.pending_fetch.take() {
                match task.await {
                    Ok(outcome) => self.process_fetch_outcome(outcome),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!(error = %e, "Post fetch task failed"),
                }
            }
        }

        if self.session_rx.has_changed().unwrap_or(false) {
            self.session_rx.mark_unchanged();
            self.enforce_gate();
        }
    }

    fn process_fetch_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Fetched(count) => {
                self.status_message = Some(format!("Loaded {} posts", count));
                let len = self.posts.snapshot().len();
                self.post_selection = self.post_selection.min(len.saturating_sub(1));
            }
            FetchOutcome::Failed(message) => {
                self.status_message = Some(format!("Failed to load posts: {}", message));
            }
            FetchOutcome::Cached | FetchOutcome::Superseded => {}
        }
    }
}

// ============================================================================
// Login form helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Form-level validation run before the session manager is called.
pub fn validate_login_form(username: &str, password: &str) -> Result<(), String> {
    let username = username.trim();
    if username.is_empty() && password.is_empty() {
        return Err("Username and password required".to_string());
    }
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(format!("Username must be at most {} characters", MAX_USERNAME_LENGTH));
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(format!("Password must be at most {} characters", MAX_PASSWORD_LENGTH));
    }
    Ok(())
}

/// User-facing text for a failed login
pub fn login_error_message(error: &anyhow::Error) -> String {
    if let Some(SessionError::Superseded) = error.downcast_ref::<SessionError>() {
        return "Login was interrupted. Please try again.".to_string();
    }
    describe_error(error)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::auth::MemoryStore;

    fn app_with_token(token: Option<&str>) -> App {
        let config = Config {
            auth_base_url: "http://127.0.0.1:9".to_string(),
            posts_base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let store = match token {
            Some(t) => MemoryStore::with_token(t),
            None => MemoryStore::default(),
        };
        let services = Services::with_store(&config, Arc::new(store)).unwrap();
        App::new(config, services)
    }

    // -------------------------------------------------------------------------
    // Counter Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_counter_starts_at_one() {
        assert_eq!(Counter::default().value(), 1);
    }

    #[test]
    fn test_counter_never_below_zero() {
        let mut counter = Counter::default();
        counter.decrement();
        assert_eq!(counter.value(), 0);
        counter.decrement();
        assert_eq!(counter.value(), 0);
        counter.increment();
        counter.increment();
        assert_eq!(counter.value(), 2);
    }

    // -------------------------------------------------------------------------
    // Tab Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_tab_next() {
        assert_eq!(Tab::Home.next(), Tab::Posts);
        assert_eq!(Tab::Posts.next(), Tab::Logout);
        assert_eq!(Tab::Logout.next(), Tab::Home); // Wraps around
    }

    #[test]
    fn test_tab_prev() {
        assert_eq!(Tab::Home.prev(), Tab::Logout); // Wraps around
        assert_eq!(Tab::Logout.prev(), Tab::Posts);
        assert_eq!(Tab::Posts.prev(), Tab::Home);
    }

    // -------------------------------------------------------------------------
    // Input Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_username_char() {
        assert!(can_add_username_char(0, 'a'));
        assert!(can_add_username_char(49, 'z'));
        assert!(!can_add_username_char(50, 'a'));
        assert!(!can_add_username_char(0, '\x00'));
        assert!(!can_add_username_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\r'));
    }

    #[test]
    fn test_validate_login_form() {
        assert!(validate_login_form("emilys", "emilyspass").is_ok());
        assert_eq!(
            validate_login_form("", "").unwrap_err(),
            "Username and password required"
        );
        assert_eq!(validate_login_form("   ", "x").unwrap_err(), "Username is required");
        assert_eq!(validate_login_form("emilys", "").unwrap_err(), "Password is required");
        assert!(validate_login_form(&"u".repeat(51), "x").is_err());
    }

    #[test]
    fn test_login_error_message_for_superseded() {
        let err = anyhow::Error::new(SessionError::Superseded);
        assert_eq!(login_error_message(&err), "Login was interrupted. Please try again.");
    }

    // -------------------------------------------------------------------------
    // Gate / Navigation Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_restore_without_token_shows_login() {
        let mut app = app_with_token(None);
        assert_eq!(app.state, AppState::Splash);

        app.restore_session();

        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_restore_with_token_goes_home() {
        let mut app = app_with_token(Some("saved"));
        app.restore_session();
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.current_tab, Tab::Home);
    }

    #[tokio::test]
    async fn test_logout_from_any_tab_locks_out() {
        let mut app = app_with_token(Some("saved"));
        app.restore_session();
        app.current_tab = Tab::Posts;
        app.detail = Some(PostDetail::new(1));

        app.logout();

        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.detail.is_none());
        assert!(!app.session_state().is_authenticated());

        // Navigation stays behind the gate
        app.state = AppState::Normal;
        app.navigate(Tab::Posts);
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_outside_logout_is_noticed() {
        let mut app = app_with_token(Some("saved"));
        app.restore_session();

        // Another holder of the session manager signs out
        app.session.logout();
        app.check_background_tasks().await;

        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_login_form_validation_blocks_request() {
        let mut app = app_with_token(None);
        app.restore_session();
        app.login_username = "emilys".to_string();
        app.login_password.clear();

        assert!(app.attempt_login().await.is_err());
        assert_eq!(app.login_error.as_deref(), Some("Password is required"));
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_detail_for_unknown_post_is_none() {
        let mut app = app_with_token(Some("saved"));
        app.restore_session();
        app.detail = Some(PostDetail::new(42));
        assert!(app.detail_post().is_none());
    }
}
