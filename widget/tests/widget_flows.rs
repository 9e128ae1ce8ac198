//! End-to-end flows through the composed app and the real HTTP adapter.

#[path = "fake_supabase_support/server.rs"]
mod server;

use std::sync::Arc;

use feedback_widget::app::{AppPorts, WidgetApp};
use feedback_widget::cli::{self, Cli};
use feedback_widget::domain::messages;
use feedback_widget::domain::ports::{
    InMemoryLocalStore, LocalStore, UnsupportedScreenCapture, keys,
};
use feedback_widget::domain::{Credentials, ErrorCode, FormView, SubmitOutcome};
use feedback_widget::outbound::supabase::{SupabaseConnector, SupabaseOptions};
use feedback_widget::test_support::MutableClock;
use clap::Parser;
use rstest::rstest;
use serde_json::json;

use server::FakeSupabase;

const KEY: &str = "eyJanon";
const ADMIN_ID: &str = "0d7f3a52-9a41-4e55-b7c1-5f0e4c2d1a90";

fn app(fake: &FakeSupabase, configured: bool) -> (WidgetApp, Arc<InMemoryLocalStore>) {
    let store = Arc::new(if configured {
        InMemoryLocalStore::with_entries([(keys::SUPABASE_URL, fake.url()), (keys::SUPABASE_API_KEY, KEY)])
    } else {
        InMemoryLocalStore::default()
    });
    let clock = Arc::new(MutableClock::default());
    let connector = Arc::new(SupabaseConnector::new(
        SupabaseOptions::default(),
        store.clone(),
        clock.clone(),
    ));
    let app = WidgetApp::new(AppPorts {
        local_store: store.clone(),
        connector,
        capture: Arc::new(UnsupportedScreenCapture),
        clock,
    });
    (app, store)
}

async fn run(app: &WidgetApp, args: &[&str]) -> (color_eyre::Result<()>, String) {
    let argv = std::iter::once("feedback-widget").chain(args.iter().copied());
    let command = Cli::try_parse_from(argv).expect("arguments parse").command;
    let mut out = Vec::new();
    let result = cli::run(app, command, &mut out).await;
    (result, String::from_utf8(out).expect("utf-8 output"))
}

#[rstest]
#[actix_web::test]
async fn setup_probes_then_stores_credentials() {
    let fake = FakeSupabase::start();
    fake.respond("GET", "/rest/v1/feedbacks", 200, "[]");
    let (app, store) = app(&fake, false);

    app.setup
        .connect(&format!("  {}  ", fake.url()), KEY)
        .await
        .expect("setup succeeds");

    assert!(app.config.is_configured());
    assert_eq!(
        store.get(keys::SUPABASE_URL).expect("store readable").as_deref(),
        Some(fake.url())
    );
    let probe = fake.only_request_to("GET", "/rest/v1/feedbacks");
    assert_eq!(probe.header("apikey"), Some(KEY));
    assert!(!app.setup.snapshot().is_connecting);
    fake.stop().await;
}

#[rstest]
#[case(
    404,
    json!({ "code": "42P01", "message": "relation \"public.feedbacks\" does not exist" }),
    messages::SETUP_TABLE_MISSING
)]
#[case(401, json!({ "message": "Invalid API key" }), messages::SETUP_INVALID_KEY)]
#[actix_web::test]
async fn setup_failures_leave_credentials_unsaved(
    #[case] status: u16,
    #[case] body: serde_json::Value,
    #[case] expected: &str,
) {
    let fake = FakeSupabase::start();
    fake.respond_json("GET", "/rest/v1/feedbacks", status, &body);
    let (app, store) = app(&fake, false);

    let error = app
        .setup
        .connect(fake.url(), KEY)
        .await
        .expect_err("setup fails");

    assert_eq!(error.message(), expected);
    assert_eq!(app.setup.snapshot().error.as_deref(), Some(expected));
    assert!(!app.config.is_configured());
    assert_eq!(store.get(keys::SUPABASE_URL).expect("store readable"), None);
    fake.stop().await;
}

#[rstest]
#[actix_web::test]
async fn submit_inserts_row_then_uploads_under_echoed_id() {
    let fake = FakeSupabase::start();
    fake.respond_json(
        "POST",
        "/rest/v1/feedbacks",
        201,
        &json!({ "tracking_id": "FB-echoed" }),
    );
    fake.respond_json(
        "POST",
        "/storage/v1/object/attachments/public/FB-echoed/trace.log",
        200,
        &json!({ "Key": "attachments/public/FB-echoed/trace.log" }),
    );
    let (app, _) = app(&fake, true);
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("trace.log");
    std::fs::write(&path, b"stack trace").expect("write fixture");

    let (result, out) = run(
        &app,
        &[
            "submit",
            "--description",
            "Crash when saving a draft",
            "--attach",
            path.to_str().expect("utf-8 path"),
            "--visit",
            "profile",
        ],
    )
    .await;

    result.expect("submitted");
    assert!(out.contains("Your tracking id is FB-echoed."));
    assert!(!out.contains("Warning"));
    let insert = fake.only_request_to("POST", "/rest/v1/feedbacks").json();
    assert_eq!(insert["attachment_names"], json!(["trace.log"]));
    assert_eq!(insert["current_route"], "profile");
    assert_eq!(insert["navigation_history"], json!(["home", "profile"]));
    let upload = fake.only_request_to(
        "POST",
        "/storage/v1/object/attachments/public/FB-echoed/trace.log",
    );
    assert_eq!(upload.body, b"stack trace");
    fake.stop().await;
}

#[rstest]
#[actix_web::test]
async fn rejected_submission_shows_generic_copy() {
    let fake = FakeSupabase::start();
    fake.respond_json(
        "POST",
        "/rest/v1/feedbacks",
        403,
        &json!({ "code": "42501", "message": "new row violates row-level security policy" }),
    );
    let (app, _) = app(&fake, true);
    app.form.set_description("The export button does nothing");

    let outcome = app.form.submit().await;

    let SubmitOutcome::Failed(error) = outcome else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert_eq!(error.code(), ErrorCode::Forbidden);
    let state = app.form.snapshot();
    assert_eq!(state.error.as_deref(), Some(messages::SUBMIT_GENERIC));
    assert_eq!(state.view, FormView::Form);
    assert!(!state.is_submitting);
    fake.stop().await;
}

#[rstest]
#[actix_web::test]
async fn admin_signs_in_and_triages_feedback() {
    let fake = FakeSupabase::start();
    fake.respond_json(
        "POST",
        "/auth/v1/token",
        200,
        &json!({
            "access_token": "admin-access",
            "refresh_token": "admin-refresh",
            "expires_in": 3600,
            "user": { "id": ADMIN_ID, "email": "admin@example.com" }
        }),
    );
    fake.respond_json(
        "GET",
        "/rest/v1/profiles",
        200,
        &json!([{ "id": ADMIN_ID, "role": "admin" }]),
    );
    fake.respond_json(
        "GET",
        "/rest/v1/feedbacks",
        200,
        &json!([{
            "id": 3,
            "created_at": "2026-03-01T12:00:00Z",
            "title": "Broken export",
            "description": "The export button does nothing",
            "type": "bug_report",
            "severity": "medium",
            "status": "new",
            "tracking_id": "FB-3",
            "attachment_names": ["trace.log"]
        }]),
    );
    fake.respond("PATCH", "/rest/v1/feedbacks", 204, "");
    let (app, _) = app(&fake, true);
    let credentials = Credentials::try_from_parts("admin@example.com", "pw").expect("valid");
    app.auth.sign_in(&credentials).await.expect("signed in");

    let (listed, out) = run(&app, &["list"]).await;
    listed.expect("listed");
    assert!(out.contains("FB-3"));
    assert!(out.contains("Broken export"));

    let (shown, out) = run(&app, &["show", "3"]).await;
    shown.expect("shown");
    assert!(out.contains(&format!(
        "{}/storage/v1/object/public/attachments/public/FB-3/trace.log",
        fake.url()
    )));

    let (updated, _) = run(&app, &["update", "3", "--status", "in_progress"]).await;
    updated.expect("updated");
    let patch = fake.only_request_to("PATCH", "/rest/v1/feedbacks");
    assert_eq!(patch.header("authorization"), Some("Bearer admin-access"));
    assert_eq!(patch.json(), json!({ "status": "in_progress", "severity": "medium" }));
    fake.stop().await;
}
