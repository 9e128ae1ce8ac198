//! First-run connection setup.
//!
//! Credentials are checked locally, then proven with a throwaway client
//! before anything is stored.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use super::ports::{BackendConnector, BackendCredentials, BackendError};
use super::{ConfigService, Error, messages};

/// Public key prefixes the hosted backend issues.
pub const KEY_PREFIXES: [&str; 3] = ["sbp_", "ey", "sb_publishable_"];

const MISSING_TABLE: &str = "relation \"public.feedbacks\" does not exist";

/// Setup form status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupState {
    /// A connection attempt is running.
    pub is_connecting: bool,
    /// Failure from the last attempt.
    pub error: Option<String>,
}

/// Validates, probes and stores backend credentials.
pub struct SetupService {
    connector: Arc<dyn BackendConnector>,
    config: ConfigService,
    state: watch::Sender<SetupState>,
}

impl fmt::Debug for SetupService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupService")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SetupService {
    /// Idle setup service.
    pub fn new(connector: Arc<dyn BackendConnector>, config: ConfigService) -> Self {
        let (state, _) = watch::channel(SetupState::default());
        Self {
            connector,
            config,
            state,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SetupState {
        self.state.borrow().clone()
    }

    /// Follow setup changes.
    pub fn subscribe(&self) -> watch::Receiver<SetupState> {
        self.state.subscribe()
    }

    /// Check, probe and store `url` and `key`.
    ///
    /// A call made while another is running returns at once with
    /// [`messages::SETUP_IN_PROGRESS`] and leaves the state alone.
    pub async fn connect(&self, url: &str, key: &str) -> Result<(), Error> {
        let started = self.state.send_if_modified(|s| {
            if s.is_connecting {
                return false;
            }
            s.is_connecting = true;
            s.error = None;
            true
        });
        if !started {
            return Err(Error::conflict(messages::SETUP_IN_PROGRESS));
        }

        let result = self.attempt(url.trim(), key.trim()).await;
        self.state.send_modify(|s| {
            s.is_connecting = false;
            s.error = result.as_ref().err().map(|error| error.message().to_owned());
        });
        result
    }

    async fn attempt(&self, url: &str, key: &str) -> Result<(), Error> {
        validate(url, key)?;
        let credentials = BackendCredentials::new(url, key);
        let client = self.connector.connect(&credentials).map_err(|error| {
            warn!(%error, "could not build probe client");
            Error::invalid_request(messages::SETUP_INVALID_URL)
        })?;
        client.feedbacks.probe().await.map_err(|error| {
            warn!(%error, details = error.details(), "setup probe failed");
            probe_error(&error)
        })?;
        self.config.save_credentials(url, key)?;
        info!(url, "backend credentials verified and saved");
        Ok(())
    }
}

/// Local checks run before any network traffic.
pub fn validate(url: &str, key: &str) -> Result<(), Error> {
    if url.is_empty() || key.is_empty() {
        return Err(Error::invalid_request(messages::SETUP_MISSING_FIELDS));
    }
    if Url::parse(url).is_err() {
        return Err(Error::invalid_request(messages::SETUP_INVALID_URL));
    }
    if !KEY_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
        return Err(Error::invalid_request(messages::SETUP_INVALID_KEY_FORMAT));
    }
    Ok(())
}

fn probe_error(error: &BackendError) -> Error {
    let unauthorized = matches!(error, BackendError::Rejected { status: 401, .. });
    if unauthorized || error.mentions("JWT") || error.mentions("Unauthorized") {
        Error::unauthorized(messages::SETUP_INVALID_KEY)
    } else if error.mentions(MISSING_TABLE) || error.mentions("schema cache") {
        Error::not_found(messages::SETUP_TABLE_MISSING)
    } else if error.is_transport() {
        Error::unavailable(messages::SETUP_CONNECT_FAILED)
    } else {
        Error::from_backend(error)
    }
}

#[cfg(test)]
mod tests;
