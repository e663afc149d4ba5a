//! In-memory caching of remote collections.
//!
//! This module provides the `CollectionStore`, a fetch-once cache for a
//! named remote collection (the post feed) with an observable
//! idle/loading/error status. Nothing is written to disk and nothing is
//! refreshed automatically; `clear` is the only way to force a refetch.

pub mod store;

pub use store::{CollectionSnapshot, CollectionStore, FetchOutcome, FetchStatus, RemoteSource};
