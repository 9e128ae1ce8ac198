//! Error shared by every port the backend adapter implements.
//!
//! The hosted backend answers every surface (rows, auth, storage) with the
//! same failure shapes, so the ports share one error type rather than each
//! wrapping the same four cases.

use super::define_port_error;

define_port_error! {
    /// Failures raised by backend adapters.
    pub enum BackendError {
        /// The request never produced a response.
        Transport { message: String } => "backend transport failed: {message}",
        /// The backend answered with a non-success status.
        Rejected { status: u16, message: String, details: String } =>
            "backend rejected request ({status}): {message}",
        /// The response body did not match the expected shape.
        Decode { message: String } => "backend response decode failed: {message}",
        /// The adapter refused to build the request.
        InvalidRequest { message: String } => "backend request invalid: {message}",
    }
}

impl BackendError {
    /// Message reported by the backend or the adapter.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message }
            | Self::Rejected { message, .. }
            | Self::Decode { message }
            | Self::InvalidRequest { message } => message.as_str(),
        }
    }

    /// Extra detail the backend attached to a rejection, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Rejected { details, .. } if !details.is_empty() => Some(details.as_str()),
            _ => None,
        }
    }

    /// Return true when the request failed before reaching the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Return true when either the message or details contain `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.message().contains(needle) || self.details().is_some_and(|d| d.contains(needle))
    }
}
