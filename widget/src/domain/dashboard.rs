//! Administrator dashboard over the feedback table.
//!
//! Local state only changes after the backend confirms an edit or delete.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::{
    AdminPanel, AdminView, AttachmentLink, ButtonAppearance, ConfigService, Error, FeedbackRecord,
    FeedbackSeverity, FeedbackStatus, FeedbackStore, FeedbackType, FeedbackUpdate, messages,
};

/// Either every value or exactly one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter<T> {
    /// No restriction.
    #[default]
    All,
    /// Only this value.
    Only(T),
}

impl<T: PartialEq> Filter<T> {
    /// Return true when `value` passes.
    pub fn matches(&self, value: Option<&T>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => value == Some(wanted),
        }
    }
}

/// Filters applied to the feedback list, conjunctively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardFilters {
    /// Type filter.
    pub feedback_type: Filter<FeedbackType>,
    /// Status filter.
    pub status: Filter<FeedbackStatus>,
    /// Severity filter; records without a severity only pass `All`.
    pub severity: Filter<FeedbackSeverity>,
}

impl DashboardFilters {
    /// Return true when `record` passes every filter.
    pub fn accepts(&self, record: &FeedbackRecord) -> bool {
        self.feedback_type.matches(Some(&record.feedback_type))
            && self.status.matches(Some(&record.status))
            && self.severity.matches(record.severity.as_ref())
    }
}

/// Record opened in the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFeedback {
    /// The record.
    pub record: FeedbackRecord,
    /// Resolved attachment links.
    pub links: Vec<AttachmentLink>,
}

/// Edit dialog state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDialog {
    /// Record under edit.
    pub record: FeedbackRecord,
    /// Pending status.
    pub status: FeedbackStatus,
    /// Pending severity.
    pub severity: Option<FeedbackSeverity>,
    /// A save is in flight.
    pub is_saving: bool,
    /// Last failure, prefixed for display.
    pub error: Option<String>,
}

/// Delete confirmation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDialog {
    /// Record to delete.
    pub record: FeedbackRecord,
    /// A delete is in flight.
    pub is_deleting: bool,
    /// Last failure, prefixed for display.
    pub error: Option<String>,
}

/// Settings page fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    /// Launcher colour.
    pub button_color: String,
    /// Launcher label.
    pub button_text: String,
    /// Stored project URL.
    pub supabase_url: String,
    /// Stored public key.
    pub supabase_key: Zeroizing<String>,
    /// Confirmation shown after saving.
    pub message: Option<String>,
}

impl fmt::Debug for SettingsForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsForm")
            .field("button_color", &self.button_color)
            .field("button_text", &self.button_text)
            .field("supabase_url", &self.supabase_url)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    /// Loaded records, newest first.
    pub records: Vec<FeedbackRecord>,
    /// A load is in flight.
    pub is_loading: bool,
    /// Load failure.
    pub error: Option<String>,
    /// Active filters.
    pub filters: DashboardFilters,
    /// Detail view.
    pub selected: Option<SelectedFeedback>,
    /// Edit dialog.
    pub editing: Option<EditDialog>,
    /// Delete confirmation.
    pub deleting: Option<DeleteDialog>,
    /// Settings page.
    pub settings: SettingsForm,
}

impl DashboardState {
    /// Records passing the active filters.
    pub fn filtered(&self) -> Vec<&FeedbackRecord> {
        self.records
            .iter()
            .filter(|record| self.filters.accepts(record))
            .collect()
    }
}

/// Admin dashboard controller.
pub struct Dashboard {
    store: FeedbackStore,
    config: ConfigService,
    panel: Arc<AdminPanel>,
    state: watch::Sender<DashboardState>,
}

impl fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Closed dashboard with nothing loaded.
    pub fn new(store: FeedbackStore, config: ConfigService, panel: Arc<AdminPanel>) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            store,
            config,
            panel,
            state,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Follow dashboard changes.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// Open on the overview, then load settings and records.
    pub async fn open(&self) {
        self.panel.open();
        self.panel.set_view(AdminView::Dashboard);
        self.load_settings();
        self.load_feedbacks().await;
    }

    /// Close and forget records, errors and dialogs.
    pub fn close(&self) {
        self.panel.close();
        self.state.send_modify(|s| {
            s.records.clear();
            s.error = None;
            s.selected = None;
            s.editing = None;
            s.deleting = None;
        });
    }

    /// Fill the settings page from stored values.
    pub fn load_settings(&self) {
        let ButtonAppearance { color, text } = self.panel.appearance();
        let credentials = self.config.stored_credentials();
        self.state.send_modify(|s| {
            s.settings.button_color = color;
            s.settings.button_text = text;
            s.settings.supabase_url = credentials
                .as_ref()
                .map(|c| c.url().to_owned())
                .unwrap_or_default();
            s.settings.supabase_key = Zeroizing::new(
                credentials
                    .as_ref()
                    .map(|c| c.api_key().to_owned())
                    .unwrap_or_default(),
            );
        });
    }

    /// Reload records from the backend.
    pub async fn load_feedbacks(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
        let result = self.store.get_feedbacks().await;
        self.state.send_modify(|s| {
            s.is_loading = false;
            match result {
                Ok(records) => s.records = records,
                Err(error) => {
                    warn!(code = ?error.code(), message = error.message(), "dashboard load failed");
                    s.error = Some(messages::DASHBOARD_LOAD_FAILED.to_owned());
                }
            }
        });
    }

    /// Replace the active filters.
    pub fn set_filters(&self, filters: DashboardFilters) {
        self.state
            .send_if_modified(|s| std::mem::replace(&mut s.filters, filters) != filters);
    }

    /// Open the detail view and resolve attachment links.
    pub fn view_feedback(&self, record: FeedbackRecord) {
        let links = if record.attachment_names.is_empty() {
            Vec::new()
        } else {
            self.store
                .attachment_urls(&record.tracking_id, &record.attachment_names)
                .unwrap_or_else(|error| {
                    warn!(tracking_id = %record.tracking_id, message = error.message(), "attachment links unavailable");
                    Vec::new()
                })
        };
        self.state
            .send_modify(|s| s.selected = Some(SelectedFeedback { record, links }));
    }

    /// Close the detail view.
    pub fn close_feedback(&self) {
        self.state.send_if_modified(|s| s.selected.take().is_some());
    }

    /// Open the edit dialog seeded from `record`.
    pub fn open_edit(&self, record: FeedbackRecord) {
        self.state.send_modify(|s| {
            s.editing = Some(EditDialog {
                status: record.status,
                severity: record.severity,
                record,
                is_saving: false,
                error: None,
            });
        });
    }

    /// Change the pending status.
    pub fn set_edit_status(&self, status: FeedbackStatus) {
        self.state.send_if_modified(|s| match s.editing.as_mut() {
            Some(dialog) => {
                dialog.status = status;
                true
            }
            None => false,
        });
    }

    /// Change the pending severity.
    pub fn set_edit_severity(&self, severity: Option<FeedbackSeverity>) {
        self.state.send_if_modified(|s| match s.editing.as_mut() {
            Some(dialog) => {
                dialog.severity = severity;
                true
            }
            None => false,
        });
    }

    /// Close the edit dialog.
    pub fn close_edit(&self) {
        self.state.send_if_modified(|s| s.editing.take().is_some());
    }

    /// Persist the edit. The list is patched and the dialog closed only on
    /// success.
    pub async fn save_edit(&self) -> Result<(), Error> {
        let mut pending = None;
        self.state.send_if_modified(|s| match s.editing.as_mut() {
            Some(dialog) if !dialog.is_saving => {
                dialog.is_saving = true;
                dialog.error = None;
                pending = Some((
                    dialog.record.id,
                    FeedbackUpdate {
                        status: dialog.status,
                        severity: dialog.severity,
                    },
                ));
                true
            }
            _ => false,
        });
        let Some((id, update)) = pending else {
            return Ok(());
        };

        let result = self.store.update_feedback(id, update).await;
        self.state.send_modify(|s| match &result {
            Ok(()) => {
                for record in s.records.iter_mut().filter(|record| record.id == id) {
                    record.apply(&update);
                }
                s.editing = None;
            }
            Err(error) => {
                if let Some(dialog) = s.editing.as_mut() {
                    dialog.is_saving = false;
                    dialog.error = Some(format!("Update failed: {}", error.message()));
                }
            }
        });
        if result.is_ok() {
            info!(%id, status = %update.status, "feedback updated");
        }
        result
    }

    /// Open the delete confirmation for `record`.
    pub fn open_delete(&self, record: FeedbackRecord) {
        self.state.send_modify(|s| {
            s.deleting = Some(DeleteDialog {
                record,
                is_deleting: false,
                error: None,
            });
        });
    }

    /// Close the delete confirmation.
    pub fn close_delete(&self) {
        self.state.send_if_modified(|s| s.deleting.take().is_some());
    }

    /// Delete the confirmed record. It leaves the list only on success.
    pub async fn confirm_delete(&self) -> Result<(), Error> {
        let mut pending = None;
        self.state.send_if_modified(|s| match s.deleting.as_mut() {
            Some(dialog) if !dialog.is_deleting => {
                dialog.is_deleting = true;
                dialog.error = None;
                pending = Some(dialog.record.id);
                true
            }
            _ => false,
        });
        let Some(id) = pending else {
            return Ok(());
        };

        let result = self.store.delete_feedback(id).await;
        self.state.send_modify(|s| match &result {
            Ok(()) => {
                s.records.retain(|record| record.id != id);
                s.deleting = None;
            }
            Err(error) => {
                if let Some(dialog) = s.deleting.as_mut() {
                    dialog.is_deleting = false;
                    dialog.error = Some(format!("Delete failed: {}", error.message()));
                }
            }
        });
        if result.is_ok() {
            info!(%id, "feedback deleted");
        }
        result
    }

    /// Persist the launcher appearance and, when both are given, new
    /// credentials. Saving credentials re-initialises the backend.
    pub fn save_settings(&self, color: &str, text: &str, url: &str, key: &str) -> Result<(), Error> {
        self.panel.set_appearance(ButtonAppearance {
            color: color.to_owned(),
            text: text.to_owned(),
        })?;
        let (trimmed_url, trimmed_key) = (url.trim(), key.trim());
        let with_credentials = !trimmed_url.is_empty() && !trimmed_key.is_empty();
        if with_credentials {
            self.config.save_credentials(trimmed_url, trimmed_key)?;
        }
        let message = if with_credentials {
            messages::SETTINGS_SAVED_WITH_CREDENTIALS
        } else {
            messages::SETTINGS_SAVED
        };
        self.state.send_modify(|s| {
            s.settings.button_color = color.to_owned();
            s.settings.button_text = text.to_owned();
            if with_credentials {
                s.settings.supabase_url = trimmed_url.to_owned();
                s.settings.supabase_key = Zeroizing::new(trimmed_key.to_owned());
            }
            s.settings.message = Some(message.to_owned());
        });
        Ok(())
    }
}

/// Label for an optional severity; records without one show a dash.
pub fn severity_label(severity: Option<FeedbackSeverity>) -> &'static str {
    severity.map_or("-", |severity| severity.label())
}
