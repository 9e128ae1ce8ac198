//! Feedback submissions and the records administrators triage.
//!
//! A [`NewFeedback`] is what the widget collects. It becomes a
//! [`FeedbackInsert`] once a [`TrackingId`] is attached, and comes back from
//! the backend as a [`FeedbackRecord`].

use std::fmt;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;

use super::auth::UserId;

mod enums;

pub use enums::{FeedbackSeverity, FeedbackStatus, FeedbackType, ParseFeedbackEnumError};

/// Shortest accepted description, in characters.
pub const DESCRIPTION_MIN_CHARS: usize = 10;
/// Longest accepted description, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 5000;

/// Reasons a description is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionError {
    /// Fewer than [`DESCRIPTION_MIN_CHARS`] characters.
    TooShort {
        /// Characters supplied.
        actual: usize,
    },
    /// More than [`DESCRIPTION_MAX_CHARS`] characters.
    TooLong {
        /// Characters supplied.
        actual: usize,
    },
}

impl fmt::Display for DescriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { actual } => write!(
                f,
                "description must be at least {DESCRIPTION_MIN_CHARS} characters (got {actual})"
            ),
            Self::TooLong { actual } => write!(
                f,
                "description must be at most {DESCRIPTION_MAX_CHARS} characters (got {actual})"
            ),
        }
    }
}

impl std::error::Error for DescriptionError {}

/// Check that a description falls within the accepted length.
///
/// # Examples
/// ```
/// use feedback_widget::domain::{validate_description, DescriptionError};
///
/// assert!(validate_description("The save button does nothing").is_ok());
/// assert_eq!(
///     validate_description("too short"),
///     Err(DescriptionError::TooShort { actual: 9 })
/// );
/// ```
pub fn validate_description(description: &str) -> Result<(), DescriptionError> {
    let actual = description.chars().count();
    if actual < DESCRIPTION_MIN_CHARS {
        Err(DescriptionError::TooShort { actual })
    } else if actual > DESCRIPTION_MAX_CHARS {
        Err(DescriptionError::TooLong { actual })
    } else {
        Ok(())
    }
}

/// Client-generated identifier quoted back to the user after submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    /// Prefix shared by every generated id.
    pub const PREFIX: &'static str = "FB-";

    /// Derive an id from the clock's current Unix time in milliseconds.
    ///
    /// Two submissions in the same millisecond receive the same id.
    pub fn generate(clock: &dyn Clock) -> Self {
        Self(format!("{}{}", Self::PREFIX, clock.utc().timestamp_millis()))
    }

    /// Wrap an id received from the backend.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the id.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrackingId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Backend row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FeedbackId(i64);

impl FeedbackId {
    /// Wrap a raw row id.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw row id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the widget collects before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFeedback {
    /// Short summary.
    pub title: String,
    /// Full description; see [`validate_description`].
    pub description: String,
    /// Kind of feedback.
    pub feedback_type: FeedbackType,
    /// Severity chosen in the form. Dropped unless the type is a bug report.
    pub severity: Option<FeedbackSeverity>,
    /// Contact email; empty means none.
    pub email: String,
    /// Contact name; empty means none.
    pub name: String,
    /// File names of the attachments uploaded after insertion.
    pub attachment_names: Vec<String>,
    /// Signed-in user, if any.
    pub user_id: Option<UserId>,
    /// View the user was on when submitting.
    pub current_route: String,
    /// Recent views, oldest first.
    pub navigation_history: Vec<String>,
}

impl NewFeedback {
    /// Build the row to insert under `tracking_id`.
    pub fn into_insert(self, tracking_id: TrackingId) -> FeedbackInsert {
        let severity = match self.feedback_type {
            FeedbackType::BugReport => self.severity,
            _ => None,
        };
        FeedbackInsert {
            title: self.title,
            description: self.description,
            feedback_type: self.feedback_type,
            severity,
            email: non_empty(self.email),
            name: non_empty(self.name),
            attachment_names: self.attachment_names,
            status: FeedbackStatus::New,
            tracking_id,
            user_id: self.user_id,
            current_route: self.current_route,
            navigation_history: self.navigation_history,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Row written by the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackInsert {
    /// Short summary.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Kind of feedback.
    pub feedback_type: FeedbackType,
    /// Present only for bug reports.
    pub severity: Option<FeedbackSeverity>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact name.
    pub name: Option<String>,
    /// Attachment file names.
    pub attachment_names: Vec<String>,
    /// Always [`FeedbackStatus::New`].
    pub status: FeedbackStatus,
    /// Client-generated id.
    pub tracking_id: TrackingId,
    /// Signed-in user, if any.
    pub user_id: Option<UserId>,
    /// View at submission time.
    pub current_route: String,
    /// Navigation history at submission time.
    pub navigation_history: Vec<String>,
}

/// A stored feedback row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRecord {
    /// Row id.
    pub id: FeedbackId,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
    /// Short summary.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Kind of feedback.
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    /// Severity, for bug reports.
    pub severity: Option<FeedbackSeverity>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact name.
    pub name: Option<String>,
    /// Triage state.
    pub status: FeedbackStatus,
    /// Client-generated id.
    pub tracking_id: TrackingId,
    /// Attachment file names.
    pub attachment_names: Vec<String>,
    /// Submitting user, if signed in.
    pub user_id: Option<UserId>,
    /// View at submission time.
    pub current_route: Option<String>,
    /// Navigation history at submission time.
    pub navigation_history: Vec<String>,
}

impl FeedbackRecord {
    /// Apply an administrator edit locally.
    pub fn apply(&mut self, update: &FeedbackUpdate) {
        self.status = update.status;
        if update.severity.is_some() {
            self.severity = update.severity;
        }
    }
}

/// Fields an administrator may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackUpdate {
    /// New triage state.
    pub status: FeedbackStatus,
    /// New severity; `None` leaves the column untouched on the backend.
    pub severity: Option<FeedbackSeverity>,
}

#[cfg(test)]
mod tests;
