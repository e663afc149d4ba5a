//! Core library for the storefront client.
//!
//! - `auth`: session manager, credential stores and the route gate
//! - `cache`: fetch-once store for remote collections
//! - `api`: HTTP client for the auth and posts APIs
//! - `models`: entity types
//! - `config`: on-disk configuration with env overrides

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;

use api::ApiClient;
use auth::{open_store, SessionManager};
use cache::CollectionStore;
use config::Config;
use models::Post;

/// Name the post collection is registered under
pub const POSTS_COLLECTION: &str = "posts";

/// The session manager and post store, wired to the same API client.
pub struct Services {
    pub session: Arc<SessionManager>,
    pub posts: Arc<CollectionStore<Post>>,
}

impl Services {
    /// Build everything from config, using the credential backend it names.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        let store = open_store(config.credential_backend, &cache_dir);
        Self::with_store(config, store)
    }

    pub fn with_store(config: &Config, store: Arc<dyn auth::CredentialStore>) -> Result<Self> {
        let api = ApiClient::new(config)?;
        let session = SessionManager::new(api.clone(), store, config.session_lifetime_minutes);
        let posts: CollectionStore<Post> = CollectionStore::new(POSTS_COLLECTION, Arc::new(api));
        Ok(Self {
            session: Arc::new(session),
            posts: Arc::new(posts),
        })
    }
}
