use serde::{Deserialize, Serialize};

use super::Entity;

/// A post from the feed.
///
/// The API calls the author field `userId`; it is exposed here as `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    #[serde(rename = "userId")]
    pub owner_id: i64,
}

impl Post {
    /// First line of the body, used for list previews
    pub fn summary(&self) -> &str {
        self.body.lines().next().unwrap_or_default()
    }
}

impl Entity for Post {
    fn id(&self) -> i64 {
        self.id
    }
}
