//! Runtime settings loaded via OrthoConfig.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::outbound::local_store::default_store_path;
use crate::outbound::supabase::SupabaseOptions;

const DEFAULT_BUCKET: &str = "attachments";
const FALLBACK_STORE_PATH: &str = "feedback-widget.json";

/// Settings shared by every command.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FEEDBACK_WIDGET")]
pub struct WidgetSettings {
    /// Local store file override.
    pub store_path: Option<PathBuf>,
    /// Storage bucket holding attachments.
    pub storage_bucket: Option<String>,
    /// Per-request HTTP timeout in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
    /// Emit logs as JSON lines.
    pub json_logs: Option<bool>,
}

impl WidgetSettings {
    /// Load from the environment and configuration files only; command-line
    /// arguments belong to the CLI parser.
    ///
    /// # Errors
    ///
    /// Returns the OrthoConfig error when a source cannot be parsed.
    pub fn load_ambient() -> ortho_config::OrthoResult<Self> {
        Self::load_from_iter([OsString::from("feedback-widget")])
    }

    /// Configured store path, else the platform default.
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .or_else(default_store_path)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_STORE_PATH))
    }

    /// Configured bucket, else `attachments`.
    pub fn storage_bucket(&self) -> &str {
        self.storage_bucket
            .as_deref()
            .filter(|bucket| !bucket.trim().is_empty())
            .unwrap_or(DEFAULT_BUCKET)
    }

    /// Whether logs are emitted as JSON lines; off unless set.
    pub fn json_logs(&self) -> bool {
        self.json_logs.unwrap_or(false)
    }

    /// Request timeout; zero is raised to one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Transport options for the backend adapter.
    pub fn supabase_options(&self) -> SupabaseOptions {
        SupabaseOptions {
            bucket: self.storage_bucket().to_owned(),
            request_timeout: self.request_timeout(),
        }
    }
}
