//! Builds [`SupabaseClient`]s from stored credentials.

use std::sync::Arc;

use mockable::Clock;
use tracing::debug;

use super::{SupabaseClient, SupabaseOptions};
use crate::domain::ports::{
    BackendClient, BackendConnector, BackendCredentials, BackendError, LocalStore,
};

/// Connector for the hosted backend.
pub struct SupabaseConnector {
    options: SupabaseOptions,
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
}

impl SupabaseConnector {
    /// Connector whose clients persist sessions in `store`.
    pub fn new(options: SupabaseOptions, store: Arc<dyn LocalStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            options,
            store,
            clock,
        }
    }
}

impl std::fmt::Debug for SupabaseConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConnector")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BackendConnector for SupabaseConnector {
    fn connect(&self, credentials: &BackendCredentials) -> Result<BackendClient, BackendError> {
        let client = SupabaseClient::new(
            credentials,
            &self.options,
            self.store.clone(),
            self.clock.clone(),
        )?;
        debug!(url = credentials.url(), "built backend client");
        Ok(BackendClient::from_shared(Arc::new(client)))
    }
}
