//! Open/close and view-selection state for the widget, the admin panel and
//! the flow chooser.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;

use super::Error;
use super::ports::{LocalStore, keys};

/// How long the launcher stays highlighted after an error trigger, in
/// milliseconds.
pub const TRIGGER_WINDOW_MS: i64 = 1000;

/// Values to place in the form the next time it opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefill {
    /// Title to prefill.
    pub title: Option<String>,
    /// Description to prefill.
    pub description: Option<String>,
}

/// Snapshot of the feedback panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackPanelState {
    /// Whether the form is shown.
    pub open: bool,
    /// End of the current highlight window.
    pub triggered_until: Option<DateTime<Utc>>,
    /// Pending prefill values.
    pub prefill: Prefill,
}

/// Visibility of the feedback form plus error-trigger prefill.
pub struct FeedbackPanel {
    state: watch::Sender<FeedbackPanelState>,
    clock: Arc<dyn Clock>,
}

impl FeedbackPanel {
    /// Closed panel with nothing pending.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(FeedbackPanelState::default());
        Self { state, clock }
    }

    /// Show the form.
    pub fn open(&self) {
        self.state.send_if_modified(|state| !std::mem::replace(&mut state.open, true));
    }

    /// Hide the form.
    pub fn close(&self) {
        self.state.send_if_modified(|state| std::mem::replace(&mut state.open, false));
    }

    /// Return true while the form is shown.
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    /// Stash prefill values and highlight the launcher without opening it.
    pub fn trigger_for_error(&self, title: impl Into<String>, description: impl Into<String>) {
        let until = self.clock.utc() + TimeDelta::milliseconds(TRIGGER_WINDOW_MS);
        self.state.send_modify(|state| {
            state.prefill = Prefill {
                title: Some(title.into()),
                description: Some(description.into()),
            };
            state.triggered_until = Some(until);
        });
    }

    /// Return true inside the highlight window.
    pub fn is_triggered(&self) -> bool {
        let now = self.clock.utc();
        self.state
            .borrow()
            .triggered_until
            .is_some_and(|until| now < until)
    }

    /// Take the pending prefill, leaving none behind.
    pub fn take_prefill(&self) -> Prefill {
        let mut taken = Prefill::default();
        self.state.send_if_modified(|state| {
            taken = std::mem::take(&mut state.prefill);
            taken != Prefill::default()
        });
        taken
    }

    /// Follow panel changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedbackPanelState> {
        self.state.subscribe()
    }
}

impl fmt::Debug for FeedbackPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackPanel")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Pages of the admin panel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminView {
    /// Overview.
    #[default]
    Dashboard,
    /// Feedback list.
    Feedbacks,
    /// Appearance and credentials.
    Settings,
}

impl FromStr for AdminView {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "dashboard" => Ok(Self::Dashboard),
            "feedbacks" => Ok(Self::Feedbacks),
            "settings" => Ok(Self::Settings),
            other => Err(format!("unknown admin view: {other}")),
        }
    }
}

/// Launcher button colour and label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonAppearance {
    /// CSS colour.
    pub color: String,
    /// Label.
    pub text: String,
}

impl ButtonAppearance {
    /// Colour used until one is saved.
    pub const DEFAULT_COLOR: &'static str = "#3b82f6";
    /// Label used until one is saved.
    pub const DEFAULT_TEXT: &'static str = "Feedback";
}

impl Default for ButtonAppearance {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR.to_owned(),
            text: Self::DEFAULT_TEXT.to_owned(),
        }
    }
}

/// Snapshot of the admin panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPanelState {
    /// Whether the panel is shown.
    pub open: bool,
    /// Active page.
    pub view: AdminView,
    /// Launcher appearance.
    pub appearance: ButtonAppearance,
}

/// Admin panel visibility, page and persisted launcher appearance.
pub struct AdminPanel {
    state: watch::Sender<AdminPanelState>,
    store: Arc<dyn LocalStore>,
}

impl AdminPanel {
    /// Closed panel with the stored appearance, or defaults.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        let defaults = ButtonAppearance::default();
        let appearance = ButtonAppearance {
            color: read_or(store.as_ref(), keys::BUTTON_COLOR, defaults.color),
            text: read_or(store.as_ref(), keys::BUTTON_TEXT, defaults.text),
        };
        let (state, _) = watch::channel(AdminPanelState {
            appearance,
            ..AdminPanelState::default()
        });
        Self { state, store }
    }

    /// Show the panel.
    pub fn open(&self) {
        self.state.send_if_modified(|state| !std::mem::replace(&mut state.open, true));
    }

    /// Hide the panel.
    pub fn close(&self) {
        self.state.send_if_modified(|state| std::mem::replace(&mut state.open, false));
    }

    /// Return true while the panel is shown.
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    /// Switch page.
    pub fn set_view(&self, view: AdminView) {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.view, view) != view);
    }

    /// Active page.
    pub fn view(&self) -> AdminView {
        self.state.borrow().view
    }

    /// Current launcher appearance.
    pub fn appearance(&self) -> ButtonAppearance {
        self.state.borrow().appearance.clone()
    }

    /// Persist and publish a new launcher appearance.
    pub fn set_appearance(&self, appearance: ButtonAppearance) -> Result<(), Error> {
        self.store
            .set(keys::BUTTON_COLOR, &appearance.color)
            .and_then(|()| self.store.set(keys::BUTTON_TEXT, &appearance.text))
            .map_err(|error| {
                warn!(%error, "failed to persist button appearance");
                Error::internal("Could not save the appearance settings.")
            })?;
        self.state.send_modify(|state| state.appearance = appearance);
        Ok(())
    }

    /// Follow panel changes.
    pub fn subscribe(&self) -> watch::Receiver<AdminPanelState> {
        self.state.subscribe()
    }
}

impl fmt::Debug for AdminPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminPanel")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

fn read_or(store: &dyn LocalStore, key: &str, fallback: String) -> String {
    match store.get(key) {
        Ok(Some(value)) if !value.is_empty() => value,
        Ok(_) => fallback,
        Err(error) => {
            warn!(%error, key, "failed to read local store");
            fallback
        }
    }
}

/// Top-level flows offered by the demo host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppFlow {
    /// Admin dashboard.
    Admin,
    /// End-user widget.
    Widget,
}

/// Which flow, if any, is active.
#[derive(Debug)]
pub struct FlowSelector {
    current: watch::Sender<Option<AppFlow>>,
}

impl FlowSelector {
    /// No flow chosen.
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// Choose a flow.
    pub fn select(&self, flow: AppFlow) {
        self.current.send_replace(Some(flow));
    }

    /// Return to the chooser.
    pub fn reset(&self) {
        self.current.send_replace(None);
    }

    /// Active flow.
    pub fn current(&self) -> Option<AppFlow> {
        *self.current.borrow()
    }

    /// Follow flow changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<AppFlow>> {
        self.current.subscribe()
    }
}

impl Default for FlowSelector {
    fn default() -> Self {
        Self::new()
    }
}
