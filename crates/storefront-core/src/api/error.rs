use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized { message: Option<String> },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error bodies from both APIs look like `{"message": "Invalid credentials"}`
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the human-readable `message` out of a JSON error body.
    fn extract_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        let detail = message.clone().unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            400 | 422 => ApiError::Rejected(detail),
            401 => ApiError::Unauthorized { message },
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }

    /// The message the server sent back, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected(m)
            | ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::ServerError(m) => Some(m.as_str()),
            ApiError::Unauthorized { message } => message.as_deref(),
            _ => None,
        }
    }
}

/// Fallback when an error carries no usable text
const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Turn any error into the message shown to the user.
///
/// Prefers the server's own `message`, then the API error's description,
/// then the top-level description of the error chain.
pub fn describe_error(error: &anyhow::Error) -> String {
    if let Some(api_error) = error.chain().find_map(|cause| cause.downcast_ref::<ApiError>()) {
        return api_error
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| api_error.to_string());
    }
    let text = error.to_string();
    if text.trim().is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        text
    }
}
