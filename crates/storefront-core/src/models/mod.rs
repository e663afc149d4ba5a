//! Data models for storefront entities.
//!
//! - `Post`: an entry in the post feed
//! - `Entity`: anything a `CollectionStore` can hold, keyed by a stable id

pub mod post;

pub use post::Post;

/// A remote entity with a server-assigned, stable identifier.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
}
