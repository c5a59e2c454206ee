//! Error types for todoist-mcp.

use serde::Serialize;
use thiserror::Error;

/// Main error type for todoist-mcp operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Tool arguments do not satisfy the declared parameter contract
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(String),

    /// 401 from the upstream API
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 403 from the upstream API
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 404 from the upstream API, or a name that could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// 429 from the upstream API
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 5xx from the upstream API
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Any other non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Upstream returned a body we could not decode
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A value could not be converted into a JSON-safe value
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Coarse classification reported to MCP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigurationError,
    ValidationError,
    UpstreamError,
    NormalizationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::NormalizationError => "normalization_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Map an upstream HTTP status and body to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            429 => Error::RateLimited(message),
            500..=599 => Error::ServerError { status, message },
            _ => Error::Api { status, message },
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::Storage(_) => ErrorKind::ConfigurationError,
            Error::Validation(_) => ErrorKind::ValidationError,
            Error::Normalization(_) | Error::Serialization(_) => ErrorKind::NormalizationError,
            Error::Http(_)
            | Error::Unauthorized(_)
            | Error::Forbidden(_)
            | Error::NotFound(_)
            | Error::RateLimited(_)
            | Error::ServerError { .. }
            | Error::Api { .. }
            | Error::InvalidData(_)
            | Error::Other(_) => ErrorKind::UpstreamError,
        }
    }

    /// HTTP-style status carried by upstream errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized(_) => Some(401),
            Error::Forbidden(_) => Some(403),
            Error::NotFound(_) => Some(404),
            Error::RateLimited(_) => Some(429),
            Error::ServerError { status, .. } | Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for todoist-mcp operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(Error::from_status(401, "x"), Error::Unauthorized(_)));
        assert!(matches!(Error::from_status(403, "x"), Error::Forbidden(_)));
        assert!(matches!(Error::from_status(404, "x"), Error::NotFound(_)));
        assert!(matches!(Error::from_status(429, "x"), Error::RateLimited(_)));
        assert!(matches!(
            Error::from_status(503, "x"),
            Error::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            Error::from_status(400, "x"),
            Error::Api { status: 400, .. }
        ));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::Config("no token".into()).kind(),
            ErrorKind::ConfigurationError
        );
        assert_eq!(
            Error::Validation("missing content".into()).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            Error::NotFound("task".into()).kind(),
            ErrorKind::UpstreamError
        );
        assert_eq!(
            Error::Normalization("too deep".into()).kind(),
            ErrorKind::NormalizationError
        );
    }

    #[test]
    fn test_status_preserved() {
        assert_eq!(Error::from_status(404, "Task not found").status(), Some(404));
        assert_eq!(Error::from_status(418, "teapot").status(), Some(418));
        assert_eq!(Error::Http("connection reset".into()).status(), None);
    }

    #[test]
    fn test_message_verbatim() {
        let err = Error::from_status(404, "Task not found");
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::UpstreamError.to_string(), "upstream_error");
        assert_eq!(
            serde_json::to_value(ErrorKind::ValidationError).unwrap(),
            serde_json::json!("validation_error")
        );
    }
}
