use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, RequestContext};

use super::CredentialStore;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SessionPhase {
    /// Process just started, or restore found nothing
    #[default]
    Uninitialized,
    /// Signed out
    Unauthenticated,
    /// Holding a token
    Authenticated,
}

/// Snapshot of the session as seen by the presentation layer.
///
/// `phase == Authenticated` exactly when a non-empty token is held; the
/// constructors are the only way to build one, so the two cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionState {
    phase: SessionPhase,
    #[serde(skip)]
    #[cfg_attr(feature = "ts", ts(skip))]
    token: Option<String>,
}

impl SessionState {
    fn authenticated_with(token: String) -> Self {
        Self {
            phase: SessionPhase::Authenticated,
            token: Some(token),
        }
    }

    fn signed_out() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            token: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Tri-state view: `None` before anything is known, then `Some(true|false)`.
    pub fn authenticated(&self) -> Option<bool> {
        match self.phase {
            SessionPhase::Uninitialized => None,
            SessionPhase::Unauthenticated => Some(false),
            SessionPhase::Authenticated => Some(true),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated() == Some(true)
    }

    /// Context to attach to outbound requests made on behalf of this session
    pub fn request_context(&self) -> RequestContext {
        match self.token {
            Some(ref token) => RequestContext::with_bearer(token.as_str()),
            None => RequestContext::anonymous(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Login was superseded by a newer session change")]
    Superseded,
}

/// Single source of truth for the current credential.
///
/// Shared behind an `Arc`; every operation takes `&self`. Each `login`
/// and `logout` bumps a generation counter, and a login whose response
/// arrives after a newer operation started is discarded. State changes are
/// published on a watch channel.
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
    lifetime_minutes: u32,
    generation: Mutex<u64>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>, lifetime_minutes: u32) -> Self {
        let (state_tx, _) = watch::channel(SessionState::default());
        Self {
            api,
            store,
            lifetime_minutes,
            generation: Mutex::new(0),
            state_tx,
        }
    }

    /// Current session snapshot
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Receiver that wakes on every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn request_context(&self) -> RequestContext {
        self.state_tx.borrow().request_context()
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load the persisted token, once, at startup.
    ///
    /// Returns whether a session was restored. A missing token leaves the
    /// session `Uninitialized`; a storage read error is logged and treated
    /// the same way.
    pub fn restore(&self) -> bool {
        let token = match self.store.get() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let Some(token) = token else {
            debug!("No persisted session found");
            return false;
        };

        let mut generation = self.lock_generation();
        *generation += 1;
        self.state_tx.send_replace(SessionState::authenticated_with(token));
        info!("Session restored from persisted token");
        true
    }

    /// Exchange credentials for a token and sign in.
    ///
    /// On failure the session is left exactly as it was and the error is
    /// returned for display. If a newer `login` or a `logout` started while
    /// this one was waiting on the network, the result is dropped and
    /// `SessionError::Superseded` is returned.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<()> {
        let issued = {
            let mut generation = self.lock_generation();
            *generation += 1;
            *generation
        };

        let tokens = match self
            .api
            .authenticate(identifier, secret, self.lifetime_minutes)
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(e);
            }
        };

        let generation = self.lock_generation();
        if *generation != issued {
            warn!(issued, current = *generation, "Discarding superseded login result");
            return Err(SessionError::Superseded.into());
        }

        if let Err(e) = self.store.set(&tokens.access_token) {
            warn!(error = %e, "Failed to persist token; session will not survive a restart");
        }
        self.state_tx
            .send_replace(SessionState::authenticated_with(tokens.access_token));
        info!(username = ?tokens.username, "Login successful");
        Ok(())
    }

    /// Sign out. Always succeeds.
    ///
    /// In-memory state is cleared first; failing to delete the persisted
    /// token is logged and otherwise ignored, so a storage fault can never
    /// keep a signed-out user inside protected screens.
    pub fn logout(&self) {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.state_tx.send_replace(SessionState::signed_out());
        if let Err(e) = self.store.delete() {
            warn!(error = %e, "Failed to delete persisted token");
        }
        info!("Logged out");
    }
}
