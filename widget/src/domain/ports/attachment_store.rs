//! Driven port for the attachments bucket.

use async_trait::async_trait;
use url::Url;

use crate::domain::{Attachment, StoragePath};

use super::BackendError;

/// Object storage for submission attachments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Upload one file to `path`.
    async fn upload(&self, path: &StoragePath, file: &Attachment) -> Result<(), BackendError>;

    /// Public URL for `path`. Computed locally; the object need not exist.
    fn public_url(&self, path: &StoragePath) -> Result<Url, BackendError>;
}
