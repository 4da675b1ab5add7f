use serde::{Deserialize, Serialize};

/// Unified error type for all settings API operations.
///
/// Each variant carries the `endpoint` (method + path) that produced it, plus
/// variant-specific context. All variants are serializable so front ends can
/// forward them as structured notifications.
///
/// # Retryable Errors
///
/// The following variants represent transient failures:
/// - [`NetworkError`](Self::NetworkError): connection refused, DNS failure, 502/503/504
/// - [`Timeout`](Self::Timeout): request timed out
/// - [`RateLimited`](Self::RateLimited): HTTP 429
///
/// Only idempotent reads are retried automatically; writes surface the error
/// so the user can re-invoke the action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ApiError {
    /// A network-level error occurred.
    NetworkError {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Error details.
        detail: String,
    },

    /// The request did not complete within its deadline.
    Timeout {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Error details.
        detail: String,
    },

    /// The backend asked the client to slow down (HTTP 429).
    RateLimited {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Seconds to wait, from the `Retry-After` header.
        retry_after: Option<u64>,
        /// Raw response body, if any.
        raw_message: Option<String>,
    },

    /// The session is missing or was rejected (HTTP 401/403).
    Unauthorized {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Message from the backend, if available.
        raw_message: Option<String>,
    },

    /// The addressed resource does not exist (HTTP 404).
    NotFound {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Message from the backend, if available.
        raw_message: Option<String>,
    },

    /// The backend answered with a non-2xx status and an error payload.
    ServerRejected {
        /// Endpoint that produced the error.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// `error` or `message` field of the body, or the raw body.
        message: String,
    },

    /// The request could not be built (bad base URL, invalid path segment).
    InvalidRequest {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Details about the problem.
        detail: String,
    },

    /// Failed to parse the backend's response.
    ParseError {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Endpoint that produced the error.
        endpoint: String,
        /// Details about the serialization failure.
        detail: String,
    },
}

impl ApiError {
    /// Whether this is expected behavior (user input, missing resource, bad
    /// credentials), used for log level selection.
    ///
    /// Use `warn` when this returns `true` and `error` otherwise.
    /// **Keep this in sync when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Unauthorized { .. } | Self::NotFound { .. } | Self::InvalidRequest { .. } => true,
            Self::ServerRejected { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }

    /// Whether the failure is transient and the same request may succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }

    /// Endpoint that produced this error.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::NetworkError { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::RateLimited { endpoint, .. }
            | Self::Unauthorized { endpoint, .. }
            | Self::NotFound { endpoint, .. }
            | Self::ServerRejected { endpoint, .. }
            | Self::InvalidRequest { endpoint, .. }
            | Self::ParseError { endpoint, .. }
            | Self::SerializationError { endpoint, .. } => endpoint,
        }
    }

    /// Short message suitable for a transient notification.
    ///
    /// Server-reported messages are passed through verbatim; transport and
    /// parse failures collapse to a generic text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ServerRejected { message, .. } => message.clone(),
            Self::Unauthorized { .. } => "Not authorized, please log in again".to_string(),
            Self::NotFound { raw_message, .. } => raw_message
                .clone()
                .unwrap_or_else(|| "Not found".to_string()),
            Self::Timeout { .. } => "Connection timed out".to_string(),
            Self::NetworkError { .. } | Self::RateLimited { .. } => {
                "Connection failed".to_string()
            }
            Self::InvalidRequest { detail, .. } => detail.clone(),
            Self::ParseError { .. } | Self::SerializationError { .. } => {
                "Unexpected response from server".to_string()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { endpoint, detail } => {
                write!(f, "[{endpoint}] Network error: {detail}")
            }
            Self::Timeout { endpoint, detail } => {
                write!(f, "[{endpoint}] Request timeout: {detail}")
            }
            Self::RateLimited {
                endpoint,
                retry_after,
                ..
            } => {
                if let Some(secs) = retry_after {
                    write!(f, "[{endpoint}] Rate limited (retry after {secs}s)")
                } else {
                    write!(f, "[{endpoint}] Rate limited")
                }
            }
            Self::Unauthorized {
                endpoint,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{endpoint}] Unauthorized: {msg}")
                } else {
                    write!(f, "[{endpoint}] Unauthorized")
                }
            }
            Self::NotFound {
                endpoint,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{endpoint}] Not found: {msg}")
                } else {
                    write!(f, "[{endpoint}] Not found")
                }
            }
            Self::ServerRejected {
                endpoint,
                status,
                message,
            } => {
                write!(f, "[{endpoint}] HTTP {status}: {message}")
            }
            Self::InvalidRequest { endpoint, detail } => {
                write!(f, "[{endpoint}] Invalid request: {detail}")
            }
            Self::ParseError { endpoint, detail } => {
                write!(f, "[{endpoint}] Parse error: {detail}")
            }
            Self::SerializationError { endpoint, detail } => {
                write!(f, "[{endpoint}] Serialization error: {detail}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convenience type alias for `Result<T, ApiError>`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_network_error() {
        let e = ApiError::NetworkError {
            endpoint: "GET /api/settings".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "[GET /api/settings] Network error: connection refused"
        );
    }

    #[test]
    fn display_server_rejected() {
        let e = ApiError::ServerRejected {
            endpoint: "POST /api/settings/sonarr".to_string(),
            status: 400,
            message: "Invalid URL".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "[POST /api/settings/sonarr] HTTP 400: Invalid URL"
        );
    }

    #[test]
    fn display_rate_limited_with_retry_after() {
        let e = ApiError::RateLimited {
            endpoint: "GET /api/settings".to_string(),
            retry_after: Some(5),
            raw_message: None,
        };
        assert_eq!(
            e.to_string(),
            "[GET /api/settings] Rate limited (retry after 5s)"
        );
    }

    #[test]
    fn client_errors_are_expected() {
        let e = ApiError::ServerRejected {
            endpoint: "x".into(),
            status: 422,
            message: "bad".into(),
        };
        assert!(e.is_expected());
    }

    #[test]
    fn server_errors_are_not_expected() {
        let e = ApiError::ServerRejected {
            endpoint: "x".into(),
            status: 500,
            message: "boom".into(),
        };
        assert!(!e.is_expected());
    }

    #[test]
    fn user_message_passes_server_text_through() {
        let e = ApiError::ServerRejected {
            endpoint: "x".into(),
            status: 400,
            message: "Instance name already in use".into(),
        };
        assert_eq!(e.user_message(), "Instance name already in use");
    }

    #[test]
    fn user_message_hides_transport_detail() {
        let e = ApiError::NetworkError {
            endpoint: "x".into(),
            detail: "tcp connect error: 10.0.0.1:8989".into(),
        };
        assert_eq!(e.user_message(), "Connection failed");
    }

    #[test]
    fn serializes_with_code_tag() {
        let e = ApiError::Timeout {
            endpoint: "x".into(),
            detail: "10s".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["code"], "Timeout");
        assert_eq!(json["endpoint"], "x");
    }
}
