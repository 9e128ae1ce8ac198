//! Lazily built backend client and the credentials that configure it.
//!
//! The provider publishes an immutable, versioned [`BackendHandle`]. A new
//! handle replaces the old one wholesale whenever credentials change; an
//! operation captures the handle once at its start and uses it to the end,
//! so a re-configuration never switches backends under a running call.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{info, warn};

use super::Error;
use super::ports::{BackendClient, BackendConnector, BackendCredentials, LocalStore, keys};

/// One configured backend, tagged with the generation that produced it.
pub struct BackendHandle {
    generation: u64,
    client: BackendClient,
}

impl BackendHandle {
    /// Monotonically increasing build counter, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Backend surfaces.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Shared, possibly absent handle.
pub type SharedHandle = Option<Arc<BackendHandle>>;

/// Builds and publishes the backend handle from persisted credentials.
pub struct BackendProvider {
    store: Arc<dyn LocalStore>,
    connector: Arc<dyn BackendConnector>,
    handle: watch::Sender<SharedHandle>,
    generation: AtomicU64,
}

impl BackendProvider {
    /// Create the provider and run [`Self::initialize`] once.
    pub fn new(store: Arc<dyn LocalStore>, connector: Arc<dyn BackendConnector>) -> Self {
        let (handle, _) = watch::channel(None);
        let provider = Self {
            store,
            connector,
            handle,
            generation: AtomicU64::new(0),
        };
        provider.initialize();
        provider
    }

    /// Rebuild the handle from whatever credentials are stored now.
    ///
    /// Publishes "no client" when either value is missing or empty, or when
    /// the connector rejects them.
    pub fn initialize(&self) -> SharedHandle {
        let next = self.read_credentials().and_then(|credentials| {
            match self.connector.connect(&credentials) {
                Ok(client) => {
                    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    info!(generation, url = credentials.url(), "backend client initialised");
                    Some(Arc::new(BackendHandle { generation, client }))
                }
                Err(error) => {
                    warn!(%error, url = credentials.url(), "stored credentials rejected");
                    None
                }
            }
        });
        if next.is_none() {
            info!("backend not configured");
        }
        self.handle.send_replace(next.clone());
        next
    }

    /// Handle current at the time of the call.
    pub fn current(&self) -> SharedHandle {
        self.handle.borrow().clone()
    }

    /// Follow handle replacements.
    pub fn subscribe(&self) -> watch::Receiver<SharedHandle> {
        self.handle.subscribe()
    }

    /// Return true while a handle exists.
    pub fn is_configured(&self) -> bool {
        self.handle.borrow().is_some()
    }

    /// Local store the credentials are read from.
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    fn read_credentials(&self) -> Option<BackendCredentials> {
        let url = self.read_non_empty(keys::SUPABASE_URL)?;
        let key = self.read_non_empty(keys::SUPABASE_API_KEY)?;
        Some(BackendCredentials::new(url, key))
    }

    fn read_non_empty(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(error) => {
                warn!(%error, key, "failed to read local store");
                None
            }
        }
    }
}

impl fmt::Debug for BackendProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendProvider")
            .field("handle", &*self.handle.borrow())
            .finish_non_exhaustive()
    }
}

/// Persists credentials and re-initialises the provider.
#[derive(Debug, Clone)]
pub struct ConfigService {
    provider: Arc<BackendProvider>,
}

impl ConfigService {
    /// Wrap a provider.
    pub fn new(provider: Arc<BackendProvider>) -> Self {
        Self { provider }
    }

    /// Return true while a handle exists.
    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Store `url` and `key`, then rebuild the handle. The key format is not
    /// checked here.
    pub fn save_credentials(&self, url: &str, key: &str) -> Result<(), Error> {
        let store = self.provider.store();
        store
            .set(keys::SUPABASE_URL, url)
            .and_then(|()| store.set(keys::SUPABASE_API_KEY, key))
            .map_err(|error| {
                warn!(%error, "failed to persist credentials");
                Error::internal("Could not save the Supabase credentials.")
            })?;
        self.provider.initialize();
        Ok(())
    }

    /// Credentials currently stored, if both are present.
    pub fn stored_credentials(&self) -> Option<BackendCredentials> {
        self.provider.read_credentials()
    }

    /// Forget the stored credentials and drop the handle.
    pub fn clear_credentials(&self) -> Result<(), Error> {
        let store = self.provider.store();
        store
            .remove(keys::SUPABASE_URL)
            .and_then(|()| store.remove(keys::SUPABASE_API_KEY))
            .map_err(|error| {
                warn!(%error, "failed to clear credentials");
                Error::internal("Could not clear the Supabase credentials.")
            })?;
        self.provider.initialize();
        Ok(())
    }
}
