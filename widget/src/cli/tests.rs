//! Tests for command dispatch over the in-memory backend.

use std::sync::Arc;

use clap::Parser;
use rstest::rstest;

use super::*;
use crate::app::AppPorts;
use crate::domain::messages;
use crate::domain::ports::{BackendError, InMemoryLocalStore, UnsupportedScreenCapture, keys};
use crate::test_support::{InMemoryBackend, InMemoryConnector, MutableClock};

const URL: &str = "https://project.supabase.co";

struct Harness {
    app: WidgetApp,
    backend: Arc<InMemoryBackend>,
}

fn harness(configured: bool) -> Harness {
    let backend = Arc::new(
        InMemoryBackend::default()
            .with_account("admin@example.com", "pw", Some(Role::Admin))
            .with_account("ada@example.com", "pw", Some(Role::Client)),
    );
    let store = if configured {
        InMemoryLocalStore::with_entries([
            (keys::SUPABASE_URL, URL),
            (keys::SUPABASE_API_KEY, "eyJkey"),
        ])
    } else {
        InMemoryLocalStore::default()
    };
    let app = WidgetApp::new(AppPorts {
        local_store: Arc::new(store),
        connector: Arc::new(InMemoryConnector::default().with_backend(URL, backend.clone())),
        capture: Arc::new(UnsupportedScreenCapture),
        clock: Arc::new(MutableClock::default()),
    });
    Harness { app, backend }
}

fn parse(args: &[&str]) -> Command {
    let argv = std::iter::once("feedback-widget").chain(args.iter().copied());
    Cli::try_parse_from(argv).expect("arguments parse").command
}

async fn exec(app: &WidgetApp, args: &[&str]) -> (Result<()>, String) {
    let mut out = Vec::new();
    let result = run(app, parse(args), &mut out).await;
    (result, String::from_utf8(out).expect("utf-8 output"))
}

async fn sign_in(app: &WidgetApp, email: &str) {
    let (result, _) = exec(app, &["sign-in", "--email", email, "--password", "pw"]).await;
    result.expect("signed in");
}

#[rstest]
fn parses_enum_flags_by_column_value() {
    let command = parse(&[
        "submit",
        "--description",
        "The export button does nothing",
        "--type",
        "feature_request",
        "--severity",
        "high",
        "--visit",
        "profile",
    ]);
    let Command::Submit(args) = command else {
        panic!("expected submit");
    };
    assert_eq!(args.feedback_type, FeedbackType::FeatureRequest);
    assert_eq!(args.severity, FeedbackSeverity::High);
    assert_eq!(args.visits, vec![View::Profile]);
}

#[rstest]
fn rejects_unknown_status() {
    let argv = ["feedback-widget", "update", "3", "--status", "done"];
    assert!(Cli::try_parse_from(argv).is_err());
}

#[rstest]
fn appearance_url_requires_key() {
    let argv = ["feedback-widget", "appearance", "--url", URL];
    assert!(Cli::try_parse_from(argv).is_err());
}

#[rstest]
#[tokio::test]
async fn setup_stores_verified_credentials() {
    let h = harness(false);

    let (result, out) = exec(&h.app, &["setup", "--url", URL, "--key", "eyJnew"]).await;

    result.expect("setup succeeds");
    assert!(out.contains("Credentials saved"));
    assert!(h.app.config.is_configured());
}

#[rstest]
#[tokio::test]
async fn setup_reports_bad_key_prefix() {
    let h = harness(false);

    let (result, _) = exec(&h.app, &["setup", "--url", URL, "--key", "nope"]).await;

    let err = result.expect_err("bad key");
    assert_eq!(err.to_string(), messages::SETUP_INVALID_KEY_FORMAT);
}

#[rstest]
#[tokio::test]
async fn status_describes_unconfigured_app() {
    let h = harness(false);

    let (result, out) = exec(&h.app, &["status"]).await;

    result.expect("status");
    assert!(out.contains("not configured"));
    assert!(out.contains("signed out"));
}

#[rstest]
#[tokio::test]
async fn submit_prints_tracking_id_and_records_history() {
    let h = harness(true);

    let (result, out) = exec(
        &h.app,
        &[
            "submit",
            "--title",
            "Broken export",
            "--description",
            "The export button does nothing",
            "--email",
            "guest@example.com",
            "--visit",
            "profile",
            "--visit",
            "settings",
        ],
    )
    .await;

    result.expect("submitted");
    assert!(out.contains("Your tracking id is FB-"));
    let rows = h.backend.rows();
    let row = rows.first().expect("row stored");
    assert_eq!(row.email.as_deref(), Some("guest@example.com"));
    assert_eq!(row.current_route.as_deref(), Some("settings"));
    assert_eq!(row.navigation_history, vec!["home", "profile", "settings"]);
}

#[rstest]
#[tokio::test]
async fn submit_rejects_short_description_without_calling_backend() {
    let h = harness(true);

    let (result, _) = exec(&h.app, &["submit", "--description", "short"]).await;

    assert!(result.is_err());
    assert!(h.backend.rows().is_empty());
}

#[rstest]
#[tokio::test]
async fn submit_attaches_files_and_reports_upload_warning() {
    let h = harness(true);
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("trace.log");
    std::fs::write(&path, b"stack trace").expect("write fixture");
    h.backend
        .fail_upload("trace.log", BackendError::rejected(413_u16, "too large", ""));
    let attach = path.to_str().expect("utf-8 path");

    let (result, out) = exec(
        &h.app,
        &[
            "submit",
            "--description",
            "Crash when saving a draft",
            "--attach",
            attach,
        ],
    )
    .await;

    result.expect("record still saved");
    assert!(out.contains("Attaching trace.log (11 Bytes)"));
    assert!(out.contains(messages::ATTACHMENTS_FAILED));
    let rows = h.backend.rows();
    let row = rows.first().expect("row stored");
    assert_eq!(row.attachment_names, vec!["trace.log"]);
}

#[rstest]
#[tokio::test]
async fn admin_commands_require_admin_role() {
    let h = harness(true);
    sign_in(&h.app, "ada@example.com").await;

    let (result, _) = exec(&h.app, &["list"]).await;

    let err = result.expect_err("client account");
    assert!(err.to_string().contains("administrator role"));
    assert!(!h.backend.calls().contains(&"list"));
}

#[rstest]
#[tokio::test]
async fn admin_commands_require_a_session() {
    let h = harness(true);

    let (result, _) = exec(&h.app, &["list"]).await;

    assert!(result.expect_err("signed out").to_string().contains("Sign in"));
}

#[rstest]
#[tokio::test]
async fn admin_lists_filters_updates_and_deletes() {
    let h = harness(true);
    let (submitted, _) = exec(
        &h.app,
        &["submit", "--description", "The export button does nothing"],
    )
    .await;
    submitted.expect("bug stored");
    let (submitted, _) = exec(
        &h.app,
        &[
            "submit",
            "--type",
            "satisfaction",
            "--description",
            "Lovely new onboarding flow",
        ],
    )
    .await;
    submitted.expect("praise stored");
    sign_in(&h.app, "admin@example.com").await;

    let (result, out) = exec(&h.app, &["list", "--type", "satisfaction"]).await;
    result.expect("listed");
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("Satisfaction"));

    let (result, out) = exec(
        &h.app,
        &["update", "1", "--status", "resolved", "--severity", "high"],
    )
    .await;
    result.expect("updated");
    assert!(out.contains("Updated #1: Resolved"));
    let rows = h.backend.rows();
    let updated = rows.iter().find(|row| row.id == FeedbackId::new(1)).expect("row 1");
    assert_eq!(updated.status, FeedbackStatus::Resolved);
    assert_eq!(updated.severity, Some(FeedbackSeverity::High));

    let (result, _) = exec(&h.app, &["delete", "2"]).await;
    result.expect("deleted");
    assert_eq!(h.backend.rows().len(), 1);
}

#[rstest]
#[tokio::test]
async fn update_failure_surfaces_dialog_message() {
    let h = harness(true);
    let (submitted, _) = exec(
        &h.app,
        &["submit", "--description", "The export button does nothing"],
    )
    .await;
    submitted.expect("stored");
    sign_in(&h.app, "admin@example.com").await;
    h.backend
        .fail_update(BackendError::rejected(403_u16, "permission denied", ""));

    let (result, _) = exec(&h.app, &["update", "1", "--status", "resolved"]).await;

    assert_eq!(
        result.expect_err("rejected").to_string(),
        "Update failed: permission denied"
    );
}

#[rstest]
#[tokio::test]
async fn show_reports_missing_ids() {
    let h = harness(true);
    sign_in(&h.app, "admin@example.com").await;

    let (result, _) = exec(&h.app, &["show", "42"]).await;

    assert_eq!(result.expect_err("missing").to_string(), "No feedback with id 42.");
}

#[rstest]
#[tokio::test]
async fn sign_out_forget_clears_credentials() {
    let h = harness(true);
    sign_in(&h.app, "ada@example.com").await;

    let (result, out) = exec(&h.app, &["sign-out", "--forget"]).await;

    result.expect("signed out");
    assert!(out.contains("Stored credentials removed."));
    assert!(h.app.auth.session().is_none());
    assert!(!h.app.config.is_configured());
}

#[rstest]
#[tokio::test]
async fn appearance_changes_persist() {
    let h = harness(true);

    let (result, out) = exec(&h.app, &["appearance", "--color", "#ff0000"]).await;

    result.expect("saved");
    assert!(out.contains(messages::SETTINGS_SAVED));
    assert_eq!(h.app.admin_panel.appearance().color, "#ff0000");
}
