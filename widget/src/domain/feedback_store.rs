//! CRUD façade over the `feedbacks` table and the attachments bucket.
//!
//! Every operation captures the current backend handle once, fails fast with
//! the not-configured error when there is none, logs technical detail and
//! returns a message safe to show.

use std::sync::Arc;

use futures_util::future::join_all;
use mockable::Clock;
use tracing::{debug, info, warn};

use super::backend_provider::{BackendHandle, BackendProvider};
use super::ports::BackendError;
use super::{
    Attachment, AttachmentLink, Error, FeedbackId, FeedbackRecord, FeedbackUpdate, NewFeedback,
    StoragePath, TrackingId, is_image_file, messages, validate_description,
};

const RLS_VIOLATION: &str = "violates row-level security policy";
const FOREIGN_KEY_VIOLATION: &str = "foreign key constraint";

/// Feedback persistence service.
#[derive(Clone)]
pub struct FeedbackStore {
    provider: Arc<BackendProvider>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FeedbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackStore")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl FeedbackStore {
    /// Build the store over `provider`, stamping ids from `clock`.
    pub fn new(provider: Arc<BackendProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { provider, clock }
    }

    fn handle(&self) -> Result<Arc<BackendHandle>, Error> {
        self.provider.current().ok_or_else(|| {
            debug!("feedback store used before configuration");
            Error::not_configured()
        })
    }

    /// Validate and insert one submission with status `new`.
    ///
    /// Returns the tracking id echoed by the backend, or the locally generated
    /// one when the backend omits it.
    pub async fn add_feedback(&self, draft: NewFeedback) -> Result<TrackingId, Error> {
        validate_description(&draft.description)
            .map_err(|error| Error::invalid_request(error.to_string()))?;
        let handle = self.handle()?;
        let tracking_id = TrackingId::generate(self.clock.as_ref());
        let row = draft.into_insert(tracking_id.clone());

        match handle.client().feedbacks.insert(&row).await {
            Ok(echoed) => {
                let confirmed = echoed.unwrap_or(tracking_id);
                info!(tracking_id = %confirmed, "feedback submitted");
                Ok(confirmed)
            }
            Err(error) => {
                warn!(
                    message = error.message(),
                    details = error.details().unwrap_or_default(),
                    %tracking_id,
                    "failed to insert feedback"
                );
                Err(submission_error(&error))
            }
        }
    }

    /// Every feedback row, newest first.
    pub async fn get_feedbacks(&self) -> Result<Vec<FeedbackRecord>, Error> {
        let handle = self.handle()?;
        handle
            .client()
            .feedbacks
            .list_newest_first()
            .await
            .map_err(|error| {
                warn!(%error, "failed to fetch feedback");
                Error::from_backend(&error)
            })
    }

    /// Upload every file concurrently under `public/<tracking_id>/<name>`.
    ///
    /// Failure messages are joined with `", "`. Files that did upload stay
    /// uploaded.
    pub async fn upload_attachments(
        &self,
        files: &[Attachment],
        tracking_id: &TrackingId,
    ) -> Result<(), Error> {
        let handle = self.handle()?;
        let store = &handle.client().attachments;
        let uploads = files.iter().map(|file| {
            let path = StoragePath::new(tracking_id, file.name());
            async move {
                store
                    .upload(&path, file)
                    .await
                    .map_err(|error| (path, error))
            }
        });

        let failures: Vec<(StoragePath, BackendError)> = join_all(uploads)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        let Some((_, first)) = failures.first() else {
            debug!(count = files.len(), %tracking_id, "attachments uploaded");
            return Ok(());
        };
        for (path, error) in &failures {
            warn!(%path, %error, "attachment upload failed");
        }
        let code = Error::from_backend(first).code();
        let joined = failures
            .iter()
            .map(|(_, error)| error.message())
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::new(code, joined))
    }

    /// Public links for a submission's attachments.
    pub fn attachment_urls(
        &self,
        tracking_id: &TrackingId,
        names: &[String],
    ) -> Result<Vec<AttachmentLink>, Error> {
        let handle = self.handle()?;
        names
            .iter()
            .map(|name| {
                let path = StoragePath::new(tracking_id, name);
                let url = handle.client().attachments.public_url(&path).map_err(|error| {
                    warn!(%path, %error, "failed to build attachment url");
                    Error::from_backend(&error)
                })?;
                Ok(AttachmentLink {
                    name: name.clone(),
                    url,
                    is_image: is_image_file(name),
                })
            })
            .collect()
    }

    /// Change status and severity of one row.
    pub async fn update_feedback(&self, id: FeedbackId, update: FeedbackUpdate) -> Result<(), Error> {
        let handle = self.handle()?;
        handle
            .client()
            .feedbacks
            .update(id, &update)
            .await
            .map_err(|error| {
                warn!(%id, %error, "failed to update feedback");
                Error::from_backend(&error)
            })
    }

    /// Delete one row.
    pub async fn delete_feedback(&self, id: FeedbackId) -> Result<(), Error> {
        let handle = self.handle()?;
        handle
            .client()
            .feedbacks
            .delete(id)
            .await
            .map_err(|error| {
                warn!(%id, %error, "failed to delete feedback");
                Error::from_backend(&error)
            })
    }
}

fn submission_error(error: &BackendError) -> Error {
    if error.mentions(RLS_VIOLATION) {
        Error::forbidden(messages::SUBMIT_POLICY)
    } else if error.mentions(FOREIGN_KEY_VIOLATION) {
        Error::conflict(messages::SUBMIT_DATA)
    } else if error.is_transport() {
        Error::unavailable(messages::NETWORK_FAILURE)
    } else {
        Error::new(Error::from_backend(error).code(), messages::SUBMIT_GENERIC)
    }
}
