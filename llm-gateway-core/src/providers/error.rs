//! Gateway error taxonomy
//!
//! Every failure surfaced to callers carries a stable [`ErrorKind`] plus the
//! provider's original message, native error code, and HTTP status when the
//! failure came from an upstream response.

use crate::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Stable classification of a gateway failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Authentication,
    PermissionDenied,
    NotFound,
    Conflict,
    UnprocessableEntity,
    RateLimit,
    Overload,
    InternalServer,
    /// Context window exceeded. A specialization of `BadRequest`.
    PromptTooLong,
    /// Catch-all for unclassified upstream statuses
    ApiStatus,
    UnsupportedProvider,
    UnsupportedModel,
    CapabilityNotSupported,
    InvalidArgument,
    Timeout,
    Connection,
    InvalidResponse,
    Configuration,
}

impl ErrorKind {
    /// Whether this kind is (or specializes) `BadRequest`
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ErrorKind::BadRequest | ErrorKind::PromptTooLong)
    }

    /// Stable identifier, suitable for logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Authentication => "authentication",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::UnprocessableEntity => "unprocessable_entity",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Overload => "overload",
            ErrorKind::InternalServer => "internal_server",
            ErrorKind::PromptTooLong => "prompt_too_long",
            ErrorKind::ApiStatus => "api_status",
            ErrorKind::UnsupportedProvider => "unsupported_provider",
            ErrorKind::UnsupportedModel => "unsupported_model",
            ErrorKind::CapabilityNotSupported => "capability_not_supported",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details reported by an upstream provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiErrorDetail {
    /// Provider message, verbatim
    pub message: String,
    /// Provider-native error code (`error.type` for Claude, `error.code` for OpenAI-style APIs)
    pub code: Option<String>,
    /// HTTP status of the failed response
    pub status: Option<u16>,
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {})", code)?;
        }
        if let Some(status) = self.status {
            write!(f, " [status: {}]", status)?;
        }
        Ok(())
    }
}

/// Errors raised by the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream API rejected the request
    #[error("{kind} error: {detail}")]
    Api { kind: ErrorKind, detail: ApiErrorDetail },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Operation not available for this provider (file ops without a file mapper)
    #[error("Capability '{capability}' is not supported by provider '{provider}'")]
    CapabilityNotSupported { provider: String, capability: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Build an upstream API error
    pub fn api(
        kind: ErrorKind,
        message: impl Into<String>,
        code: Option<String>,
        status: Option<u16>,
    ) -> Self {
        GatewayError::Api {
            kind,
            detail: ApiErrorDetail {
                message: message.into(),
                code,
                status,
            },
        }
    }

    /// Authentication failure raised locally (token refresh, missing credentials)
    pub fn authentication(message: impl Into<String>, code: Option<String>) -> Self {
        Self::api(ErrorKind::Authentication, message, code, None)
    }

    /// The stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Api { kind, .. } => *kind,
            GatewayError::UnsupportedProvider(_) => ErrorKind::UnsupportedProvider,
            GatewayError::UnsupportedModel(_) => ErrorKind::UnsupportedModel,
            GatewayError::CapabilityNotSupported { .. } => ErrorKind::CapabilityNotSupported,
            GatewayError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            GatewayError::Timeout(_) => ErrorKind::Timeout,
            GatewayError::Connection(_) => ErrorKind::Connection,
            GatewayError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            GatewayError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// The original message, without kind or code decoration
    pub fn message(&self) -> String {
        match self {
            GatewayError::Api { detail, .. } => detail.message.clone(),
            other => other.to_string(),
        }
    }

    /// Provider-native error code, when the provider sent one
    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Api { detail, .. } => detail.code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of the upstream response, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { detail, .. } => detail.status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_connect() {
            GatewayError::Connection(format!("Connection failed: {}", err))
        } else if err.is_builder() {
            GatewayError::InvalidArgument(err.to_string())
        } else {
            GatewayError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::InvalidResponse(err.to_string())
    }
}

impl From<ConfigError> for GatewayError {
    fn from(err: ConfigError) -> Self {
        GatewayError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_too_long_is_a_bad_request() {
        assert!(ErrorKind::PromptTooLong.is_bad_request());
        assert!(ErrorKind::BadRequest.is_bad_request());
        assert!(!ErrorKind::RateLimit.is_bad_request());
    }

    #[test]
    fn api_error_exposes_message_and_code() {
        let err = GatewayError::api(
            ErrorKind::RateLimit,
            "Slow down",
            Some("rate_limit_exceeded".to_string()),
            Some(429),
        );
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.message(), "Slow down");
        assert_eq!(err.code(), Some("rate_limit_exceeded"));
        assert_eq!(err.status(), Some(429));
        assert_eq!(
            err.to_string(),
            "rate_limit error: Slow down (code: rate_limit_exceeded) [status: 429]"
        );
    }

    #[test]
    fn local_errors_have_no_code() {
        let err = GatewayError::UnsupportedModel("mistral-large".to_string());
        assert_eq!(err.kind(), ErrorKind::UnsupportedModel);
        assert_eq!(err.code(), None);
        assert_eq!(err.message(), "Unsupported model: mistral-large");
    }
}
