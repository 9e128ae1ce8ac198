//! Driven port that turns stored credentials into a backend client.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::{AttachmentStore, AuthGateway, BackendError, FeedbackRepository, ProfileRepository};

/// Project URL and public API key.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendCredentials {
    url: String,
    api_key: Zeroizing<String>,
}

impl BackendCredentials {
    /// Pair a project URL with its public key.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: Zeroizing::new(api_key.into()),
        }
    }

    /// Project URL as entered.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Public API key.
    pub fn api_key(&self) -> &str {
        self.api_key.as_str()
    }
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Every surface of one configured backend.
#[derive(Clone)]
pub struct BackendClient {
    /// `feedbacks` table.
    pub feedbacks: Arc<dyn FeedbackRepository>,
    /// Attachments bucket.
    pub attachments: Arc<dyn AttachmentStore>,
    /// Auth service.
    pub auth: Arc<dyn AuthGateway>,
    /// `profiles` table.
    pub profiles: Arc<dyn ProfileRepository>,
}

impl BackendClient {
    /// Use one adapter value for every surface.
    pub fn from_shared<T>(adapter: Arc<T>) -> Self
    where
        T: FeedbackRepository + AttachmentStore + AuthGateway + ProfileRepository + 'static,
    {
        Self {
            feedbacks: adapter.clone(),
            attachments: adapter.clone(),
            auth: adapter.clone(),
            profiles: adapter,
        }
    }
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient").finish_non_exhaustive()
    }
}

/// Builds clients from credentials.
#[cfg_attr(test, mockall::automock)]
pub trait BackendConnector: Send + Sync {
    /// Build a client. Fails when the credentials cannot form a client, for
    /// example an unparsable URL. Performs no I/O.
    fn connect(&self, credentials: &BackendCredentials) -> Result<BackendClient, BackendError>;
}
