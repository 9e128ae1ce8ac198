//! Current view and a bounded history of recently visited views.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tokio::sync::watch;

/// Longest history kept; older entries are evicted first.
pub const MAX_HISTORY_LENGTH: usize = 10;

/// Views of the host application.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Landing view.
    #[default]
    Home,
    /// Signed-in user's profile.
    Profile,
    /// Application settings.
    Settings,
}

impl View {
    /// Name recorded in feedback rows.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Profile => "profile",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "home" => Ok(Self::Home),
            "profile" => Ok(Self::Profile),
            "settings" => Ok(Self::Settings),
            other => Err(format!("unknown view: {other}")),
        }
    }
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    current: View,
    history: VecDeque<View>,
}

impl NavigationState {
    /// View currently shown.
    pub fn current(&self) -> View {
        self.current
    }

    /// Visited views, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = View> + '_ {
        self.history.iter().copied()
    }

    /// History rendered as names, oldest first.
    pub fn history_names(&self) -> Vec<String> {
        self.history.iter().map(|view| view.as_str().to_owned()).collect()
    }

    fn visit(&mut self, view: View) -> bool {
        if self.current == view {
            return false;
        }
        self.current = view;
        self.history.push_back(view);
        while self.history.len() > MAX_HISTORY_LENGTH {
            self.history.pop_front();
        }
        true
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            current: View::Home,
            history: VecDeque::from([View::Home]),
        }
    }
}

/// Tracks navigation for inclusion in feedback submissions.
///
/// # Examples
/// ```
/// use feedback_widget::domain::{NavigationTracker, View};
///
/// let tracker = NavigationTracker::new();
/// tracker.navigate_to(View::Profile);
/// tracker.navigate_to(View::Profile);
/// assert_eq!(tracker.snapshot().history_names(), vec!["home", "profile"]);
/// ```
#[derive(Debug)]
pub struct NavigationTracker {
    state: watch::Sender<NavigationState>,
}

impl NavigationTracker {
    /// Start on [`View::Home`] with a one-entry history.
    pub fn new() -> Self {
        let (state, _) = watch::channel(NavigationState::default());
        Self { state }
    }

    /// Move to `view`. Returns false, leaving state untouched, when already
    /// there.
    pub fn navigate_to(&self, view: View) -> bool {
        let moved = self.state.send_if_modified(|state| state.visit(view));
        if moved {
            tracing::debug!(view = view.as_str(), "navigated");
        }
        moved
    }

    /// View currently shown.
    pub fn current(&self) -> View {
        self.state.borrow().current
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> NavigationState {
        self.state.borrow().clone()
    }

    /// Receive every change.
    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.state.subscribe()
    }
}

impl Default for NavigationTracker {
    fn default() -> Self {
        Self::new()
    }
}
