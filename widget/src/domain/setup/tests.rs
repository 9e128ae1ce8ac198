//! Tests for credential setup.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{InMemoryLocalStore, LocalStore, keys};
use crate::domain::{BackendProvider, ErrorCode};
use crate::test_support::{InMemoryBackend, InMemoryConnector};

const URL: &str = "https://project.supabase.co";

struct Harness {
    backend: Arc<InMemoryBackend>,
    connector: Arc<InMemoryConnector>,
    provider: Arc<BackendProvider>,
    store: Arc<InMemoryLocalStore>,
    setup: SetupService,
}

#[fixture]
fn harness() -> Harness {
    let backend = Arc::new(InMemoryBackend::default());
    let connector = Arc::new(InMemoryConnector::default().with_backend(URL, backend.clone()));
    let store = Arc::new(InMemoryLocalStore::default());
    let provider = Arc::new(BackendProvider::new(store.clone(), connector.clone()));
    let setup = SetupService::new(connector.clone(), ConfigService::new(provider.clone()));
    Harness {
        backend,
        connector,
        provider,
        store,
        setup,
    }
}

#[rstest]
#[case("", "eyJkey", messages::SETUP_MISSING_FIELDS)]
#[case(URL, "   ", messages::SETUP_MISSING_FIELDS)]
#[case("not a url", "eyJkey", messages::SETUP_INVALID_URL)]
#[case(URL, "service_role_key", messages::SETUP_INVALID_KEY_FORMAT)]
#[tokio::test]
async fn malformed_input_is_rejected_before_probing(
    harness: Harness,
    #[case] url: &str,
    #[case] key: &str,
    #[case] expected: &str,
) {
    let err = harness.setup.connect(url, key).await.expect_err("rejected");

    assert_eq!(err.message(), expected);
    assert_eq!(harness.setup.snapshot().error.as_deref(), Some(expected));
    assert_eq!(harness.connector.connect_count(), 0);
    assert!(harness.backend.calls().is_empty());
}

#[rstest]
#[case("sbp_abc")]
#[case("eyJhbGciOi")]
#[case("sb_publishable_abc")]
fn recognised_key_prefixes_pass(#[case] key: &str) {
    assert!(validate(URL, key).is_ok());
}

#[rstest]
#[case(BackendError::rejected(401_u16, "Invalid API key", ""), messages::SETUP_INVALID_KEY)]
#[case(BackendError::rejected(400_u16, "JWT expired", ""), messages::SETUP_INVALID_KEY)]
#[case(
    BackendError::rejected(404_u16, "relation \"public.feedbacks\" does not exist", ""),
    messages::SETUP_TABLE_MISSING
)]
#[case(
    BackendError::rejected(404_u16, "Could not find the table 'public.feedbacks' in the schema cache", ""),
    messages::SETUP_TABLE_MISSING
)]
#[case(BackendError::transport("connection refused"), messages::SETUP_CONNECT_FAILED)]
#[case(BackendError::rejected(500_u16, "database is starting up", ""), "database is starting up")]
#[tokio::test]
async fn probe_failures_are_explained(
    harness: Harness,
    #[case] failure: BackendError,
    #[case] expected: &str,
) {
    harness.backend.fail_probe(failure);

    let err = harness.setup.connect(URL, "eyJkey").await.expect_err("probe failed");

    assert_eq!(err.message(), expected);
    assert_eq!(harness.backend.calls(), ["probe"]);
    assert!(harness.store.get(keys::SUPABASE_URL).expect("readable").is_none());
    assert!(!harness.provider.is_configured());
}

#[rstest]
#[tokio::test]
async fn successful_probe_saves_and_configures(harness: Harness) {
    harness
        .setup
        .connect(&format!(" {URL} "), "sb_publishable_key")
        .await
        .expect("connected");

    assert!(harness.provider.is_configured());
    assert_eq!(
        harness.store.get(keys::SUPABASE_URL).expect("readable").as_deref(),
        Some(URL)
    );
    let state = harness.setup.snapshot();
    assert!(!state.is_connecting);
    assert!(state.error.is_none());
}

#[rstest]
#[tokio::test]
async fn second_attempt_while_connecting_is_refused(harness: Harness) {
    let (first, second) = tokio::join!(
        harness.setup.connect(URL, "eyJkey"),
        harness.setup.connect(URL, "eyJkey"),
    );

    assert!(first.is_ok());
    let err = second.expect_err("already connecting");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.message(), messages::SETUP_IN_PROGRESS);
    assert_eq!(harness.backend.calls(), ["probe"]);
}
