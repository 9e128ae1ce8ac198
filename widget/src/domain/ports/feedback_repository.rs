//! Driven port for the `feedbacks` table.

use async_trait::async_trait;

use crate::domain::{FeedbackId, FeedbackInsert, FeedbackRecord, FeedbackUpdate, TrackingId};

use super::BackendError;

/// Row access for feedback submissions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Insert one row and return the tracking id the backend echoes, if any.
    async fn insert(&self, row: &FeedbackInsert) -> Result<Option<TrackingId>, BackendError>;

    /// Fetch every row, newest first.
    async fn list_newest_first(&self) -> Result<Vec<FeedbackRecord>, BackendError>;

    /// Change status and severity of one row.
    async fn update(&self, id: FeedbackId, update: &FeedbackUpdate) -> Result<(), BackendError>;

    /// Delete one row.
    async fn delete(&self, id: FeedbackId) -> Result<(), BackendError>;

    /// Issue the lightest possible query to prove the table is reachable.
    async fn probe(&self) -> Result<(), BackendError>;
}
