//! Driven port for the `profiles` table.

use async_trait::async_trait;

use crate::domain::{Profile, UserId};

use super::BackendError;

/// Role lookup keyed by user id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the profile row for `user_id`. Zero rows yields `None`.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Profile>, BackendError>;
}
