//! Driven port for the small key/value store kept on the user's machine.
//!
//! Holds backend credentials, button appearance and the persisted auth
//! session. Values are plain strings; callers own their encoding.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::define_port_error;

/// Well-known keys.
pub mod keys {
    /// Backend project URL.
    pub const SUPABASE_URL: &str = "supabaseUrl";
    /// Backend public API key.
    pub const SUPABASE_API_KEY: &str = "supabaseApiKey";
    /// Launcher button colour.
    pub const BUTTON_COLOR: &str = "buttonColor";
    /// Launcher button label.
    pub const BUTTON_TEXT: &str = "buttonText";
    /// Serialised auth session.
    pub const SUPABASE_SESSION: &str = "supabaseSession";
}

define_port_error! {
    /// Errors raised by local store adapters.
    pub enum LocalStoreError {
        /// Reading or writing the backing file failed.
        Io { message: String } => "local store i/o failed: {message}",
        /// The backing file exists but could not be parsed.
        Corrupt { message: String } => "local store is corrupt: {message}",
    }
}

/// Client-local key/value storage.
#[cfg_attr(test, mockall::automock)]
pub trait LocalStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;

    /// Delete a value. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

/// In-memory store used by tests and as a fallback when no file is wanted.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl InMemoryLocalStore {
    /// Create a store pre-populated with `entries`.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, LocalStoreError> {
        self.values
            .lock()
            .map_err(|_| LocalStoreError::io("in-memory store lock poisoned"))
    }
}

impl LocalStore for InMemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
