//! Domain-level error types.
//!
//! These errors are transport agnostic. Services translate port failures into
//! an [`Error`] whose message is safe to show to the person using the widget;
//! technical detail is logged where the failure happens and never stored here.

use serde::Serialize;

use super::messages;
use super::ports::BackendError;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No backend client exists because credentials are missing.
    NotConfigured,
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// The backend refused the operation under its access policy.
    Forbidden,
    /// The backend rejected the data because of a constraint.
    Conflict,
    /// The requested resource does not exist.
    NotFound,
    /// The backend could not be reached.
    Unavailable,
    /// An unexpected error occurred.
    InternalError,
}

impl ErrorCode {
    const fn fallback_message(self) -> &'static str {
        match self {
            Self::NotConfigured => messages::NOT_CONFIGURED,
            Self::Unavailable => messages::NETWORK_FAILURE,
            _ => messages::GENERIC_FAILURE,
        }
    }
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` is never blank; blank input falls back to the default copy for
///   the error code.
///
/// # Examples
/// ```
/// use feedback_widget::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(err.message(), "missing");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.fallback_message().to_owned()
        } else {
            message
        };
        Self { code, message }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message suitable for display.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Return true when the failure is the local not-configured guard.
    pub fn is_not_configured(&self) -> bool {
        self.code == ErrorCode::NotConfigured
    }

    /// The synthetic error returned when no backend client exists.
    pub fn not_configured() -> Self {
        Self::new(ErrorCode::NotConfigured, messages::NOT_CONFIGURED)
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Classify a backend failure, keeping the backend's own message.
    ///
    /// Transport failures always map to the connectivity message.
    pub(crate) fn from_backend(error: &BackendError) -> Self {
        match error {
            BackendError::Transport { .. } => Self::unavailable(messages::NETWORK_FAILURE),
            BackendError::Rejected {
                status, message, ..
            } => match *status {
                400 | 422 => Self::invalid_request(message.as_str()),
                401 => Self::unauthorized(message.as_str()),
                403 => Self::forbidden(message.as_str()),
                404 => Self::not_found(message.as_str()),
                409 => Self::conflict(message.as_str()),
                _ => Self::internal(message.as_str()),
            },
            BackendError::Decode { message } => Self::internal(message.as_str()),
            BackendError::InvalidRequest { message } => Self::invalid_request(message.as_str()),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}
