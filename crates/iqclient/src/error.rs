//! Error types for IQ Server API operations.
//!
//! Errors are categorized so callers can tell an absent entity (HTTP 404)
//! apart from a genuine failure without matching on status codes themselves.

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The addressed entity does not exist (HTTP 404).
    NotFound,
    /// The server rejected the request (other 4xx).
    Client,
    /// The server failed to handle the request (5xx).
    Server,
    /// The request never completed (DNS, TLS, connection reset, ...).
    Transport,
    /// The response body could not be decoded.
    Format,
}

impl ErrorCategory {
    /// Whether this category means "the entity is gone" rather than a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors that can occur while talking to the IQ Server API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-success status.
    ///
    /// `body` carries the full response body, unmodified.
    #[error("{status} {reason}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        reason: String,
        /// Full response body.
        body: String,
    },

    /// The call itself failed to complete.
    #[error("{0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The configured server URL is unusable.
    #[error("invalid server URL {url}: {message}")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Why it was rejected.
        message: String,
    },
}

impl Error {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            reason: reason_phrase(status).to_string(),
            body: body.into(),
        }
    }

    /// HTTP status code, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Api { status: 404, .. } => ErrorCategory::NotFound,
            Error::Api { status, .. } if *status >= 500 => ErrorCategory::Server,
            Error::Api { .. } => ErrorCategory::Client,
            Error::Transport(_) | Error::InvalidUrl { .. } => ErrorCategory::Transport,
            Error::InvalidResponse(_) => ErrorCategory::Format,
        }
    }

    /// Whether the server reported the entity as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category().is_not_found()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::api(code, String::new()),
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Canonical reason phrase for `status`, empty when it has none.
fn reason_phrase(status: u16) -> &'static str {
    ureq::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_category() {
        let err = Error::api(404, "");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_client_and_server_categories() {
        assert_eq!(Error::api(400, "bad").category(), ErrorCategory::Client);
        assert_eq!(Error::api(403, "no").category(), ErrorCategory::Client);
        assert_eq!(Error::api(500, "boom").category(), ErrorCategory::Server);
        assert_eq!(Error::api(503, "").category(), ErrorCategory::Server);
    }

    #[test]
    fn test_transport_category() {
        let err = Error::Transport("connection refused".to_string());
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(!err.is_not_found());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_api_error_display_embeds_body() {
        let err = Error::api(400, "{\"message\":\"invalid provider\"}");
        assert_eq!(
            err.to_string(),
            "400 Bad Request: {\"message\":\"invalid provider\"}"
        );
    }

    #[test]
    fn test_reason_phrase_for_less_common_statuses() {
        assert_eq!(
            Error::api(422, "{\"message\":\"bad url\"}").to_string(),
            "422 Unprocessable Entity: {\"message\":\"bad url\"}"
        );
        assert_eq!(Error::api(405, "body").to_string(), "405 Method Not Allowed: body");
        assert_eq!(Error::api(429, "body").to_string(), "429 Too Many Requests: body");
    }

    #[test]
    fn test_unregistered_status_has_empty_reason() {
        let err = Error::api(599, "odd");
        assert_eq!(err.status(), Some(599));
        assert_eq!(err.to_string(), "599 : odd");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
