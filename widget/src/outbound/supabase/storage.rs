//! Attachment uploads through the storage endpoint.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::SupabaseClient;
use crate::domain::ports::{AttachmentStore, BackendError};
use crate::domain::{Attachment, StoragePath};

impl SupabaseClient {
    /// `storage/v1/object/<prefix...>/<bucket>/<path>` with every segment
    /// percent-encoded.
    fn object_url(&self, prefix: &[&str], path: &StoragePath) -> Result<Url, BackendError> {
        let mut url = self.endpoint("storage/v1/object")?;
        url.path_segments_mut()
            .map_err(|()| BackendError::invalid_request("project URL cannot be a base"))?
            .pop_if_empty()
            .extend(prefix)
            .push(&self.bucket)
            .extend(path.as_str().split('/'));
        Ok(url)
    }
}

#[async_trait]
impl AttachmentStore for SupabaseClient {
    async fn upload(&self, path: &StoragePath, file: &Attachment) -> Result<(), BackendError> {
        let url = self.object_url(&[], path)?;
        let request = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, file.content_type())
            .header("x-upsert", "false")
            .body(file.bytes().to_vec());
        self.send(request).await.map(drop)
    }

    fn public_url(&self, path: &StoragePath) -> Result<Url, BackendError> {
        self.object_url(&["public"], path)
    }
}
