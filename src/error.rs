//! Error types for image editing.

use std::time::Duration;

/// Maximum length of a provider error message kept in an error value.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while preparing, sending, or handling an edit.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// Missing or unusable input, caught before any I/O.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Image data could not be parsed into the expected shape.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Required configuration (the API credential) is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// API key rejected or lacking permission.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the provider, if any.
        retry_after: Option<Duration>,
    },

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider message, trimmed.
        message: String,
    },

    /// The provider answered without any inline image data.
    #[error("no image data in response")]
    NoImage,

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (reading the input, saving the result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EditError {
    /// Returns the message shown to the user in the error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Decode(msg) => format!("Could not read image data: {msg}"),
            Self::Config(_) => {
                "API key is not configured. Set GEMINI_API_KEY or pass --api-key.".into()
            }
            Self::Auth(_) => {
                "Invalid or missing API Key. Please check your API key configuration.".into()
            }
            Self::RateLimited { .. } => "API rate limit exceeded. Please try again later.".into(),
            Self::NoImage => "No image data found in the API response.".into(),
            Self::ContentBlocked(msg) => format!("The request was blocked by the provider: {msg}"),
            Self::Io(e) => format!("Could not access file: {e}"),
            Self::Api { .. } | Self::Network(_) | Self::Json(_) => {
                "Failed to generate image due to an API error.".into()
            }
        }
    }

    /// Returns true if the error was raised before any network activity.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Decode(_) | Self::Config(_) | Self::Io(_)
        )
    }
}

/// Result type alias for image editing operations.
pub type Result<T> = std::result::Result<T, EditError>;

/// Reduces a provider error body to something fit for display.
///
/// Google APIs wrap errors as `{"error": {"message": ...}}`; when that shape is
/// present only the message is kept. The result is trimmed and truncated.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.to_string());

    let trimmed = extracted.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    out.push_str("...");
    out
}

/// Parses a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            EditError::RateLimited { retry_after: None }.user_message(),
            "API rate limit exceeded. Please try again later."
        );
        assert_eq!(
            EditError::NoImage.user_message(),
            "No image data found in the API response."
        );
        assert!(EditError::Auth("denied".into())
            .user_message()
            .starts_with("Invalid or missing API Key"));
        assert_eq!(
            EditError::Api {
                status: 500,
                message: "boom".into()
            }
            .user_message(),
            "Failed to generate image due to an API error."
        );
        assert_eq!(
            EditError::Validation("Please upload an image and provide a prompt.".into())
                .user_message(),
            "Please upload an image and provide a prompt."
        );
    }

    #[test]
    fn test_is_local() {
        assert!(EditError::Validation("x".into()).is_local());
        assert!(EditError::Config("x".into()).is_local());
        assert!(EditError::Decode("x".into()).is_local());
        assert!(!EditError::NoImage.is_local());
        assert!(!EditError::RateLimited { retry_after: None }.is_local());
    }

    #[test]
    fn test_error_display() {
        let err = EditError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = EditError::ContentBlocked("Safety filter triggered".into());
        assert_eq!(err.to_string(), "content blocked: Safety filter triggered");
    }

    #[test]
    fn test_sanitize_extracts_google_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(sanitize_error_message(body), "API key not valid.");
    }

    #[test]
    fn test_sanitize_truncates_plain_text() {
        let body = "x".repeat(2000);
        let clean = sanitize_error_message(&body);
        assert_eq!(clean.len(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(clean.ends_with("..."));
        assert_eq!(sanitize_error_message("  oops \n"), "oops");
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));
        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
