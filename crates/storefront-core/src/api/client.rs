//! API client for the storefront auth and posts APIs.
//!
//! This module provides the `ApiClient` struct for exchanging credentials
//! for an access token and for fetching the post feed.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::RemoteSource;
use crate::config::Config;
use crate::models::Post;

use super::{ApiError, RequestContext};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const LOGIN_PATH: &str = "/auth/login";
const POSTS_PATH: &str = "/posts";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(rename = "expiresInMins")]
    expires_in_mins: u32,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
    id: Option<i64>,
    username: Option<String>,
}

/// Result of a successful credential exchange.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: Option<i64>,
    pub username: Option<String>,
}

impl TryFrom<AuthResponse> for AuthTokens {
    type Error = ApiError;

    fn try_from(response: AuthResponse) -> Result<Self, Self::Error> {
        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::InvalidResponse("Login response did not include an access token".into())
            })?;
        Ok(Self {
            access_token,
            refresh_token: response.refresh_token,
            user_id: response.id,
            username: response.username,
        })
    }
}

/// API client for the storefront services.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    auth_base_url: String,
    posts_base_url: String,
}

impl ApiClient {
    /// Create a client for the endpoints named in `config`
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_urls(&config.auth_base_url, &config.posts_base_url)
    }

    pub fn with_base_urls(auth_base_url: &str, posts_base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
            posts_base_url: posts_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange an identifier and secret for an access token.
    ///
    /// The identifier is trimmed before it is sent. Not retried: a rejected
    /// login is reported straight back to the caller.
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
        lifetime_minutes: u32,
    ) -> Result<AuthTokens> {
        let url = format!("{}{}", self.auth_base_url, LOGIN_PATH);
        let payload = LoginRequest {
            username: identifier.trim(),
            password: secret,
            expires_in_mins: lifetime_minutes,
        };
        debug!(url = %url, username = payload.username, lifetime_minutes, "Sending login request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send authentication request")?;

        let response = Self::check_response(response).await?;

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .context("Failed to parse auth response")?;

        Ok(AuthTokens::try_from(auth)?)
    }

    /// Fetch the whole post feed in server order. No pagination is requested.
    pub async fn fetch_posts(&self, ctx: &RequestContext) -> Result<Vec<Post>> {
        let url = format!("{}{}", self.posts_base_url, POSTS_PATH);
        let posts: Vec<Post> = self.get(&url, ctx).await?;
        debug!(count = posts.len(), "Posts fetched");
        Ok(posts)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, ctx: &RequestContext) -> Result<T> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let request = ctx.apply(self.client.get(url).header(header::ACCEPT, "application/json"));
            let response = request
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl RemoteSource<Post> for ApiClient {
    async fn fetch(&self, ctx: &RequestContext) -> Result<Vec<Post>> {
        self.fetch_posts(ctx).await
    }
}

// ============================================================================
// Tests
// ============================================================================
