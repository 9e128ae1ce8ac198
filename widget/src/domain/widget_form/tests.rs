//! Tests for the feedback form flow.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    BackendError, InMemoryLocalStore, MockScreenCapture, ScreenCaptureError,
    UnsupportedScreenCapture, keys,
};
use crate::domain::{BackendProvider, Credentials, FeedbackStatus, MAX_ATTACHMENTS, Role, View};
use crate::test_support::{InMemoryBackend, InMemoryConnector, MutableClock, fixture_now};

const URL: &str = "https://project.supabase.co";
const VALID: &str = "The checkout button does nothing.";

struct Harness {
    backend: Arc<InMemoryBackend>,
    auth: Arc<AuthService>,
    navigation: Arc<NavigationTracker>,
    panel: Arc<FeedbackPanel>,
    form: FeedbackForm,
}

fn build(configured: bool, capture: Arc<dyn ScreenCapture>) -> Harness {
    let backend = Arc::new(
        InMemoryBackend::default().with_account("ada@example.com", "pw", Some(Role::Client)),
    );
    let connector = Arc::new(InMemoryConnector::default().with_backend(URL, backend.clone()));
    let entries: Vec<(&str, &str)> = if configured {
        vec![(keys::SUPABASE_URL, URL), (keys::SUPABASE_API_KEY, "eyJkey")]
    } else {
        Vec::new()
    };
    let provider = Arc::new(BackendProvider::new(
        Arc::new(InMemoryLocalStore::with_entries(entries)),
        connector,
    ));
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::default());
    let auth = Arc::new(AuthService::start(provider.clone(), clock.clone()));
    let navigation = Arc::new(NavigationTracker::new());
    let panel = Arc::new(FeedbackPanel::new(clock.clone()));
    let form = FeedbackForm::new(FormDeps {
        store: FeedbackStore::new(provider, clock.clone()),
        auth: auth.clone(),
        navigation: navigation.clone(),
        panel: panel.clone(),
        capture,
        clock,
    });
    Harness {
        backend,
        auth,
        navigation,
        panel,
        form,
    }
}

#[fixture]
fn harness() -> Harness {
    build(true, Arc::new(UnsupportedScreenCapture))
}

fn capture_returning(result: Result<Vec<u8>, ScreenCaptureError>) -> Arc<dyn ScreenCapture> {
    let mut capture = MockScreenCapture::new();
    capture
        .expect_capture()
        .times(1)
        .return_once(move |_| result);
    Arc::new(capture)
}

async fn sign_in(harness: &Harness) {
    let credentials = Credentials::try_from_parts("ada@example.com", "pw").expect("valid");
    harness.auth.sign_in(&credentials).await.expect("signed in");
}

#[rstest]
#[tokio::test]
async fn invalid_form_is_not_submitted(harness: Harness) {
    harness.form.set_description("too short");

    assert_eq!(harness.form.submit().await, SubmitOutcome::Invalid);
    assert!(harness.backend.calls().is_empty());
    assert!(!harness.form.snapshot().is_submitting);
}

#[rstest]
#[tokio::test]
async fn submission_records_context_and_shows_success(harness: Harness) {
    harness.navigation.navigate_to(View::Profile);
    harness.navigation.navigate_to(View::Settings);
    harness.form.set_title("Checkout");
    harness.form.set_description(VALID);
    harness.form.set_type(FeedbackType::BugReport);
    harness.form.set_severity(FeedbackSeverity::High);
    harness.form.set_email("guest@example.com");

    let outcome = harness.form.submit().await;

    let SubmitOutcome::Submitted {
        tracking_id,
        warning,
    } = outcome
    else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(warning.is_none());
    let state = harness.form.snapshot();
    assert_eq!(state.view, FormView::Success);
    assert_eq!(state.tracking_id.as_ref(), Some(&tracking_id));
    assert!(!state.is_submitting);

    let rows = harness.backend.rows();
    let row = rows.first().expect("row stored");
    assert_eq!(row.status, FeedbackStatus::New);
    assert_eq!(row.severity, Some(FeedbackSeverity::High));
    assert_eq!(row.email.as_deref(), Some("guest@example.com"));
    assert_eq!(row.current_route.as_deref(), Some("settings"));
    assert_eq!(row.navigation_history, ["home", "profile", "settings"]);
    assert!(row.user_id.is_none());
}

#[rstest]
#[tokio::test]
async fn signed_in_user_locks_email_and_links_user_id(harness: Harness) {
    sign_in(&harness).await;
    harness.form.sync_session();
    harness.form.set_email("someone-else@example.com");

    let state = harness.form.snapshot();
    assert!(state.email_locked);
    assert_eq!(state.email, "ada@example.com");

    harness.form.set_description(VALID);
    harness.form.submit().await;

    let rows = harness.backend.rows();
    let row = rows.first().expect("row stored");
    assert_eq!(row.user_id, harness.backend.user_id("ada@example.com"));
    assert_eq!(row.email.as_deref(), Some("ada@example.com"));
}

async fn wait_for_lock(form: &FeedbackForm, locked: bool) {
    let mut updates = form.subscribe();
    tokio::time::timeout(
        Duration::from_secs(1),
        updates.wait_for(|s| s.email_locked == locked),
    )
    .await
    .expect("form followed the session in time")
    .expect("form state still published");
}

#[rstest]
#[tokio::test]
async fn signing_in_while_open_locks_email_without_resync(harness: Harness) {
    harness.form.open();
    harness.form.set_email("guest@example.com");

    sign_in(&harness).await;
    wait_for_lock(&harness.form, true).await;
    harness.form.set_email("someone-else@example.com");
    harness.form.set_description(VALID);
    harness.form.submit().await;

    let rows = harness.backend.rows();
    let row = rows.first().expect("row stored");
    assert_eq!(row.email.as_deref(), Some("ada@example.com"));
    assert_eq!(row.user_id, harness.backend.user_id("ada@example.com"));
}

#[rstest]
#[tokio::test]
async fn signing_out_while_open_unlocks_email(harness: Harness) {
    harness.form.open();
    sign_in(&harness).await;
    wait_for_lock(&harness.form, true).await;

    harness.auth.sign_out().await.expect("signed out");
    wait_for_lock(&harness.form, false).await;
    harness.form.set_email("guest@example.com");

    assert_eq!(harness.form.snapshot().email, "guest@example.com");
}

#[rstest]
#[tokio::test]
async fn unconfigured_submission_shows_credentials_message() {
    let harness = build(false, Arc::new(UnsupportedScreenCapture));
    harness.form.set_description(VALID);

    let outcome = harness.form.submit().await;

    assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.is_not_configured()));
    let state = harness.form.snapshot();
    assert_eq!(state.error.as_deref(), Some(messages::SUBMIT_NOT_CONFIGURED));
    assert_eq!(state.view, FormView::Form);
    assert!(!state.is_submitting);
}

#[rstest]
#[tokio::test]
async fn backend_rejection_shows_generic_message(harness: Harness) {
    harness
        .backend
        .fail_insert(BackendError::rejected(500_u16, "boom", ""));
    harness.form.set_description(VALID);

    let outcome = harness.form.submit().await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(
        harness.form.snapshot().error.as_deref(),
        Some(messages::SUBMIT_GENERIC)
    );
}

#[rstest]
#[tokio::test]
async fn failed_uploads_only_warn(harness: Harness) {
    harness
        .backend
        .fail_upload("b.txt", BackendError::rejected(413_u16, "Payload too large", ""));
    harness.form.set_description(VALID);
    harness.form.add_attachments([
        Attachment::new("a.txt", b"a".to_vec()),
        Attachment::new("b.txt", b"b".to_vec()),
    ]);

    let outcome = harness.form.submit().await;

    let SubmitOutcome::Submitted { warning, .. } = outcome else {
        panic!("record is stored even when uploads fail");
    };
    assert_eq!(warning.as_deref(), Some(messages::ATTACHMENTS_FAILED));
    let state = harness.form.snapshot();
    assert_eq!(state.view, FormView::Success);
    assert_eq!(state.warning.as_deref(), Some(messages::ATTACHMENTS_FAILED));
    assert_eq!(harness.backend.rows().len(), 1);
}

#[rstest]
#[tokio::test]
async fn concurrent_submissions_store_one_record(harness: Harness) {
    harness.form.set_description(VALID);

    let (first, second) = tokio::join!(harness.form.submit(), harness.form.submit());

    let outcomes = [first, second];
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Submitted { .. }))
            .count(),
        1
    );
    assert!(outcomes.contains(&SubmitOutcome::InFlight));
    assert_eq!(harness.backend.rows().len(), 1);
}

#[rstest]
#[tokio::test]
async fn opening_applies_error_prefill_once(harness: Harness) {
    harness
        .panel
        .trigger_for_error("Error on profile", "Simulated failure");

    harness.form.open();
    let state = harness.form.snapshot();
    assert!(harness.panel.is_open());
    assert_eq!(state.title, "Error on profile");
    assert_eq!(state.description, "Simulated failure");

    harness.form.set_title("Edited");
    harness.form.open();
    assert_eq!(harness.form.snapshot().title, "Edited");
}

#[rstest]
#[tokio::test]
async fn reset_keeps_contact_fields_only_when_signed_in(harness: Harness) {
    harness.form.set_email("guest@example.com");
    harness.form.set_name("Guest");
    harness.form.set_description(VALID);
    harness.form.reset_form();
    let state = harness.form.snapshot();
    assert!(state.email.is_empty());
    assert!(state.name.is_empty());
    assert!(state.description.is_empty());

    sign_in(&harness).await;
    harness.form.sync_session();
    harness.form.set_name("Ada");
    harness.form.set_description(VALID);
    harness.form.submit().await;
    harness.form.reset_form();

    let state = harness.form.snapshot();
    assert_eq!(state.email, "ada@example.com");
    assert_eq!(state.name, "Ada");
    assert_eq!(state.view, FormView::Form);
    assert!(state.tracking_id.is_none());
    assert!(state.attachments.is_empty());
}

#[rstest]
#[tokio::test]
async fn full_capture_attaches_a_screenshot() {
    let harness = build(true, capture_returning(Ok(vec![1, 2, 3])));

    harness.form.capture_screen(CaptureMode::Full).await;

    let state = harness.form.snapshot();
    assert!(!state.hidden_for_capture);
    assert_eq!(
        state.attachments.names(),
        [format!(
            "screenshot-full-{}.png",
            fixture_now().timestamp_millis()
        )]
    );
}

#[rstest]
#[tokio::test]
async fn visible_capture_waits_for_crop() {
    let harness = build(true, capture_returning(Ok(vec![9; 16])));

    harness.form.capture_screen(CaptureMode::Visible).await;
    let state = harness.form.snapshot();
    assert_eq!(state.pending_crop.as_ref().map(|c| c.png().len()), Some(16));
    assert!(state.attachments.is_empty());

    assert!(harness.form.confirm_crop(vec![4; 4]));
    let state = harness.form.snapshot();
    assert!(state.pending_crop.is_none());
    let names = state.attachments.names();
    let name = names.first().expect("cropped screenshot attached");
    assert!(name.starts_with("screenshot-cropped-"));
    assert!(!harness.form.confirm_crop(vec![4; 4]));
}

#[rstest]
#[tokio::test]
async fn closing_discards_pending_crop() {
    let harness = build(true, capture_returning(Ok(vec![9; 16])));
    harness.form.open();
    harness.form.capture_screen(CaptureMode::Visible).await;

    harness.form.close();

    assert!(!harness.panel.is_open());
    assert!(harness.form.snapshot().pending_crop.is_none());
}

#[rstest]
#[tokio::test]
async fn capture_failure_restores_the_widget() {
    let harness = build(
        true,
        capture_returning(Err(ScreenCaptureError::render("canvas tainted"))),
    );

    harness.form.capture_screen(CaptureMode::Full).await;

    let state = harness.form.snapshot();
    assert!(!state.hidden_for_capture);
    assert_eq!(state.error.as_deref(), Some(messages::CAPTURE_FAILED));
    assert!(state.attachments.is_empty());
}

#[rstest]
#[tokio::test]
async fn attachments_are_capped_and_removable(harness: Harness) {
    harness.form.add_attachments(
        (0..7).map(|i| Attachment::new(format!("f{i}.txt"), vec![0_u8; i + 1])),
    );
    assert_eq!(harness.form.snapshot().attachments.len(), MAX_ATTACHMENTS);

    let removed = harness.form.remove_attachment(0).expect("first entry");
    assert_eq!(removed.name(), "f0.txt");
    assert!(harness.form.remove_attachment(10).is_none());
    assert_eq!(harness.form.snapshot().attachments.len(), 4);
}
