//! Authentication module for managing the user session and its credential.
//!
//! This module provides:
//! - `SessionManager`: login/logout/restore and the published session state
//! - `CredentialStore`: durable storage for the access token (keychain,
//!   file or memory)
//! - `gate`: the route gate deciding whether protected screens may render
//!
//! Tokens are requested with a 30 minute lifetime by default.

pub mod credentials;
pub mod gate;
pub mod session;

pub use credentials::{open_store, CredentialStore, FileStore, KeyringStore, MemoryStore, TOKEN_KEY};
pub use gate::{gate, Gate};
pub use session::{SessionError, SessionManager, SessionPhase, SessionState};
