//! Feedback form state and the submission flow behind it.
//!
//! State lives in a [`watch`] channel; every mutation is a short synchronous
//! closure, so no lock is ever held across an await.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ports::{CaptureMode, ScreenCapture};
use super::{
    Attachment, AttachmentList, AuthService, Error, FeedbackPanel, FeedbackSeverity, FeedbackStore,
    FeedbackType, NavigationTracker, NewFeedback, Session, TrackingId, messages,
    validate_description,
};

/// Pause between hiding the widget and rasterising the page.
pub const CAPTURE_DELAY: Duration = Duration::from_millis(150);

/// Which face of the form is showing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FormView {
    /// Editable form.
    #[default]
    Form,
    /// Confirmation with the tracking id.
    Success,
}

/// Raster waiting for the user to crop it.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingCrop(Arc<[u8]>);

impl PendingCrop {
    /// PNG bytes of the full raster.
    pub fn png(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PendingCrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PendingCrop").field(&self.0.len()).finish()
    }
}

/// Everything the form shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    /// Short summary.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Kind of feedback.
    pub feedback_type: FeedbackType,
    /// Severity; only sent for bug reports.
    pub severity: FeedbackSeverity,
    /// Contact email.
    pub email: String,
    /// Contact name.
    pub name: String,
    /// Files to upload after submission.
    pub attachments: AttachmentList,
    /// Email comes from the session and cannot be edited.
    pub email_locked: bool,
    /// Visible face.
    pub view: FormView,
    /// A submission is in flight.
    pub is_submitting: bool,
    /// Id of the last successful submission.
    pub tracking_id: Option<TrackingId>,
    /// Blocking error.
    pub error: Option<String>,
    /// Non-blocking warning shown next to a success.
    pub warning: Option<String>,
    /// Widget chrome is hidden while the page is captured.
    pub hidden_for_capture: bool,
    /// Raster waiting to be cropped.
    pub pending_crop: Option<PendingCrop>,
}

impl FormState {
    /// Return true when the description is within bounds.
    pub fn is_valid(&self) -> bool {
        validate_description(&self.description).is_ok()
    }
}

/// Result of [`FeedbackForm::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The record was stored. `warning` is set when attachments failed.
    Submitted {
        /// Id to quote back to the user.
        tracking_id: TrackingId,
        /// Attachment upload warning.
        warning: Option<String>,
    },
    /// The record was not stored; the form stays editable.
    Failed(Error),
    /// Nothing happened because the form is invalid.
    Invalid,
    /// Nothing happened because another submission is in flight.
    InFlight,
}

/// Collaborators of the form.
#[derive(Clone)]
pub struct FormDeps {
    /// Persistence.
    pub store: FeedbackStore,
    /// Session source.
    pub auth: Arc<AuthService>,
    /// Navigation history source.
    pub navigation: Arc<NavigationTracker>,
    /// Visibility and prefill.
    pub panel: Arc<FeedbackPanel>,
    /// Page rasteriser.
    pub capture: Arc<dyn ScreenCapture>,
    /// Screenshot timestamps.
    pub clock: Arc<dyn Clock>,
}

/// The end-user feedback form.
///
/// The email field follows the session for as long as the form lives.
pub struct FeedbackForm {
    deps: FormDeps,
    state: Arc<watch::Sender<FormState>>,
    session_follower: JoinHandle<()>,
}

impl fmt::Debug for FeedbackForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackForm")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

enum Start {
    Go(Box<NewFeedback>, AttachmentList),
    Invalid,
    InFlight,
}

impl FeedbackForm {
    /// Empty form in its default state, following the session.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(deps: FormDeps) -> Self {
        let (state, _) = watch::channel(FormState::default());
        let state = Arc::new(state);
        let sessions = deps.auth.subscribe_session();
        let session_follower = tokio::spawn(follow_session(sessions, state.clone()));
        let form = Self {
            deps,
            state,
            session_follower,
        };
        form.sync_session();
        form
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> FormState {
        self.state.borrow().clone()
    }

    /// Follow form changes.
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    /// Set the title.
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.state.send_modify(|s| s.title = title);
    }

    /// Set the description.
    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        self.state.send_modify(|s| s.description = description);
    }

    /// Set the feedback type.
    pub fn set_type(&self, feedback_type: FeedbackType) {
        self.state.send_modify(|s| s.feedback_type = feedback_type);
    }

    /// Set the severity.
    pub fn set_severity(&self, severity: FeedbackSeverity) {
        self.state.send_modify(|s| s.severity = severity);
    }

    /// Set the contact email. Ignored while the email is locked.
    pub fn set_email(&self, email: impl Into<String>) {
        let email = email.into();
        self.state.send_if_modified(|s| {
            if s.email_locked {
                return false;
            }
            s.email = email;
            true
        });
    }

    /// Set the contact name.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.state.send_modify(|s| s.name = name);
    }

    /// Add files, deduplicated and capped.
    pub fn add_attachments(&self, files: impl IntoIterator<Item = Attachment>) {
        let files: Vec<Attachment> = files.into_iter().collect();
        self.state.send_modify(|s| s.attachments.add(files));
    }

    /// Remove the attachment at `index`.
    pub fn remove_attachment(&self, index: usize) -> Option<Attachment> {
        let mut removed = None;
        self.state.send_if_modified(|s| {
            removed = s.attachments.remove(index);
            removed.is_some()
        });
        removed
    }

    /// Fill and lock the email from the session, or unlock it.
    pub fn sync_session(&self) {
        apply_session(&self.state, self.deps.auth.session().as_ref());
    }

    /// Open the panel and apply any pending prefill.
    pub fn open(&self) {
        self.deps.panel.open();
        let prefill = self.deps.panel.take_prefill();
        self.state.send_modify(|s| {
            if let Some(title) = prefill.title.filter(|t| !t.is_empty()) {
                s.title = title;
            }
            if let Some(description) = prefill.description.filter(|d| !d.is_empty()) {
                s.description = description;
            }
        });
        self.sync_session();
    }

    /// Close the panel, dropping any pending crop.
    pub fn close(&self) {
        self.deps.panel.close();
        self.cancel_crop();
    }

    /// Back to a blank form. Contact fields survive while signed in.
    pub fn reset_form(&self) {
        let signed_in = self.deps.auth.session().is_some();
        self.state.send_modify(|s| {
            s.title.clear();
            s.description.clear();
            s.feedback_type = FeedbackType::default();
            s.severity = FeedbackSeverity::default();
            s.attachments.clear();
            s.error = None;
            s.warning = None;
            s.view = FormView::Form;
            s.tracking_id = None;
            if !signed_in {
                s.email.clear();
                s.name.clear();
            }
        });
        self.sync_session();
    }

    /// Submit the form.
    ///
    /// Returns at once when the form is invalid or a submission is already
    /// in flight. Attachment failures after a stored record only produce a
    /// warning.
    pub async fn submit(&self) -> SubmitOutcome {
        let session = self.deps.auth.session();
        let navigation = self.deps.navigation.snapshot();
        let mut start = Start::Invalid;
        self.state.send_if_modified(|s| {
            if s.is_submitting {
                start = Start::InFlight;
                return false;
            }
            if !s.is_valid() {
                return false;
            }
            s.is_submitting = true;
            s.error = None;
            s.warning = None;
            let draft = NewFeedback {
                title: s.title.clone(),
                description: s.description.clone(),
                feedback_type: s.feedback_type,
                severity: Some(s.severity),
                email: s.email.clone(),
                name: s.name.clone(),
                attachment_names: s.attachments.names(),
                user_id: session.as_ref().map(|session| session.user().id),
                current_route: navigation.current().as_str().to_owned(),
                navigation_history: navigation.history_names(),
            };
            start = Start::Go(Box::new(draft), s.attachments.clone());
            true
        });

        let (draft, attachments) = match start {
            Start::Go(draft, attachments) => (*draft, attachments),
            Start::Invalid => return SubmitOutcome::Invalid,
            Start::InFlight => return SubmitOutcome::InFlight,
        };

        let tracking_id = match self.deps.store.add_feedback(draft).await {
            Ok(tracking_id) => tracking_id,
            Err(error) => {
                warn!(code = ?error.code(), message = error.message(), "feedback submission failed");
                let shown = if error.is_not_configured() {
                    messages::SUBMIT_NOT_CONFIGURED
                } else {
                    messages::SUBMIT_GENERIC
                };
                self.state.send_modify(|s| {
                    s.error = Some(shown.to_owned());
                    s.is_submitting = false;
                });
                return SubmitOutcome::Failed(error);
            }
        };

        let mut warning = None;
        if !attachments.is_empty() {
            if let Err(error) = self
                .deps
                .store
                .upload_attachments(attachments.as_slice(), &tracking_id)
                .await
            {
                warn!(%tracking_id, message = error.message(), "attachment upload failed");
                warning = Some(messages::ATTACHMENTS_FAILED.to_owned());
            }
        }

        info!(%tracking_id, attachments = attachments.len(), "feedback form submitted");
        let confirmed = tracking_id.clone();
        let shown_warning = warning.clone();
        self.state.send_modify(|s| {
            s.tracking_id = Some(confirmed);
            s.warning = shown_warning;
            s.view = FormView::Success;
            s.is_submitting = false;
        });
        SubmitOutcome::Submitted {
            tracking_id,
            warning,
        }
    }

    /// Hide the widget, wait for the page to settle and rasterise it.
    ///
    /// `Full` captures are attached directly; `Visible` captures wait for
    /// [`Self::confirm_crop`]. The widget is shown again in every case.
    pub async fn capture_screen(&self, mode: CaptureMode) {
        self.state.send_modify(|s| s.hidden_for_capture = true);
        tokio::time::sleep(CAPTURE_DELAY).await;
        let result = self.deps.capture.capture(mode).await;
        let stamp = self.deps.clock.utc().timestamp_millis();

        self.state.send_modify(|s| {
            s.hidden_for_capture = false;
            match result {
                Ok(png) => match mode {
                    CaptureMode::Full => s
                        .attachments
                        .add([Attachment::png(format!("screenshot-full-{stamp}.png"), png)]),
                    CaptureMode::Visible => s.pending_crop = Some(PendingCrop(png.into())),
                },
                Err(error) => {
                    warn!(%error, ?mode, "screen capture failed");
                    s.error = Some(messages::CAPTURE_FAILED.to_owned());
                }
            }
        });
    }

    /// Attach the cropped raster. Returns false when nothing was pending.
    pub fn confirm_crop(&self, cropped_png: Vec<u8>) -> bool {
        let stamp = self.deps.clock.utc().timestamp_millis();
        let mut cropped = Some(cropped_png);
        self.state.send_if_modified(|s| {
            if s.pending_crop.take().is_none() {
                return false;
            }
            if let Some(png) = cropped.take() {
                s.attachments
                    .add([Attachment::png(format!("screenshot-cropped-{stamp}.png"), png)]);
            }
            true
        })
    }

    /// Drop the pending crop.
    pub fn cancel_crop(&self) {
        self.state
            .send_if_modified(|s| s.pending_crop.take().is_some());
    }
}

impl Drop for FeedbackForm {
    fn drop(&mut self) {
        self.session_follower.abort();
    }
}

fn apply_session(state: &watch::Sender<FormState>, session: Option<&Session>) {
    let email = session.and_then(|current| current.user().email.clone());
    state.send_if_modified(|s| match email {
        Some(address) => {
            let changed = !s.email_locked || s.email != address;
            s.email = address;
            s.email_locked = true;
            changed
        }
        None => std::mem::replace(&mut s.email_locked, false),
    });
}

async fn follow_session(
    mut sessions: watch::Receiver<Option<Session>>,
    state: Arc<watch::Sender<FormState>>,
) {
    while sessions.changed().await.is_ok() {
        let session = sessions.borrow_and_update().clone();
        apply_session(&state, session.as_ref());
    }
    debug!("session source dropped; form stops following it");
}

#[cfg(test)]
mod tests;
