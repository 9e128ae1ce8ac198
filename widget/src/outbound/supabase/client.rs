//! Reqwest-backed client for one hosted backend project.
//!
//! This adapter owns transport details only: base URL joining, the `apikey`
//! and bearer headers, status mapping and JSON decoding. It also holds the
//! auth session, persisting it to the local store so it survives restarts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use super::dto::{ErrorBodyDto, StoredSessionDto};
use crate::domain::Session;
use crate::domain::ports::{BackendCredentials, BackendError, LocalStore, keys};

const DEFAULT_BUCKET: &str = "attachments";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings shared by every client a connector builds.
#[derive(Debug, Clone)]
pub struct SupabaseOptions {
    /// Storage bucket holding attachments.
    pub bucket: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for SupabaseOptions {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_owned(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for one project, implementing every backend port.
pub struct SupabaseClient {
    pub(super) http: Client,
    pub(super) base: Url,
    api_key: Zeroizing<String>,
    pub(super) bucket: String,
    store: Arc<dyn LocalStore>,
    pub(super) clock: Arc<dyn Clock>,
    session: watch::Sender<Option<Session>>,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base", &self.base.as_str())
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Build a client for `credentials`, restoring any session the store
    /// holds for the same project.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidRequest`] when the URL does not parse
    /// and [`BackendError::Transport`] when the HTTP client cannot be built.
    pub fn new(
        credentials: &BackendCredentials,
        options: &SupabaseOptions,
        store: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BackendError> {
        let base = parse_base(credentials.url())?;
        let http = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|error| BackendError::transport(error.to_string()))?;
        let restored = restore_session(store.as_ref(), base.as_str());
        let (session, _) = watch::channel(restored);
        Ok(Self {
            http,
            base,
            api_key: Zeroizing::new(credentials.api_key().to_owned()),
            bucket: options.bucket.clone(),
            store,
            clock,
            session,
        })
    }

    /// Resolve `path` (with optional query) against the project URL.
    pub(super) fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|error| BackendError::invalid_request(format!("invalid endpoint {path}: {error}")))
    }

    /// Start a request carrying the key and the best bearer token available.
    pub(super) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .session
            .borrow()
            .as_ref()
            .map_or_else(|| self.api_key.as_str().to_owned(), |s| s.access_token().to_owned());
        self.http
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(bearer)
    }

    /// Start a request authenticated with the key alone.
    pub(super) fn anonymous(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(self.api_key.as_str())
    }

    /// Send and return the body of a successful response.
    pub(super) async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, BackendError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            let error = map_status_error(status, body.as_ref());
            debug!(status = status.as_u16(), %error, "backend rejected request");
            return Err(error);
        }
        Ok(body.to_vec())
    }

    /// Send and decode a JSON body.
    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body)
            .map_err(|error| BackendError::decode(format!("invalid JSON payload: {error}")))
    }

    pub(super) fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub(super) fn session_channel(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Replace the held session and persist it. Store failures are logged;
    /// the in-memory session is still updated.
    pub(super) fn set_session(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(session) => {
                let stored = StoredSessionDto::new(self.base.as_str(), session);
                serde_json::to_string(&stored)
                    .map_err(|error| error.to_string())
                    .and_then(|json| {
                        self.store
                            .set(keys::SUPABASE_SESSION, &json)
                            .map_err(|error| error.to_string())
                    })
            }
            None => self
                .store
                .remove(keys::SUPABASE_SESSION)
                .map_err(|error| error.to_string()),
        };
        if let Err(error) = persisted {
            warn!(%error, "failed to persist auth session");
        }
        self.session.send_replace(session);
    }
}

fn parse_base(raw: &str) -> Result<Url, BackendError> {
    let mut base = Url::parse(raw.trim())
        .map_err(|error| BackendError::invalid_request(format!("invalid project URL: {error}")))?;
    if base.cannot_be_a_base() {
        return Err(BackendError::invalid_request("project URL cannot be a base"));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn restore_session(store: &dyn LocalStore, project_url: &str) -> Option<Session> {
    let raw = match store.get(keys::SUPABASE_SESSION) {
        Ok(raw) => raw?,
        Err(error) => {
            warn!(%error, "could not read persisted session");
            return None;
        }
    };
    match serde_json::from_str::<StoredSessionDto>(&raw) {
        Ok(stored) if stored.project_url == project_url => Some(stored.into_session()),
        Ok(_) => {
            debug!("ignoring session persisted for another project");
            None
        }
        Err(error) => {
            warn!(%error, "discarding unreadable persisted session");
            None
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> BackendError {
    BackendError::transport(error.to_string())
}

pub(super) fn map_status_error(status: StatusCode, body: &[u8]) -> BackendError {
    let (message, details) = serde_json::from_slice::<ErrorBodyDto>(body)
        .map(ErrorBodyDto::into_parts)
        .unwrap_or_default();
    let message = message.unwrap_or_else(|| {
        let preview = body_preview(body);
        if preview.is_empty() {
            format!("status {}", status.as_u16())
        } else {
            preview
        }
    });
    BackendError::rejected(status.as_u16(), message, details.unwrap_or_default())
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network helpers.

    use super::*;
    use crate::domain::ports::InMemoryLocalStore;
    use crate::test_support::{MutableClock, session_for};
    use rstest::rstest;

    #[rstest]
    #[case(br#"{"code":"42501","message":"new row violates row-level security policy","details":null,"hint":null}"#.as_slice(), "new row violates row-level security policy")]
    #[case(br#"{"code":400,"msg":"Invalid login credentials"}"#.as_slice(), "Invalid login credentials")]
    #[case(br#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#.as_slice(), "Refresh Token Not Found")]
    #[case(br#"{"statusCode":"413","error":"Payload too large"}"#.as_slice(), "Payload too large")]
    #[case(b"<html>\n  Bad   gateway </html>".as_slice(), "<html> Bad gateway </html>")]
    #[case(b"".as_slice(), "status 502")]
    fn error_messages_prefer_structured_fields(#[case] body: &[u8], #[case] expected: &str) {
        let error = map_status_error(StatusCode::BAD_GATEWAY, body);
        assert_eq!(error.message(), expected);
    }

    #[rstest]
    fn postgrest_details_are_kept() {
        let error = map_status_error(
            StatusCode::CONFLICT,
            br#"{"message":"insert or update violates foreign key constraint","details":"Key (user_id) is not present"}"#,
        );
        assert!(matches!(error, BackendError::Rejected { status: 409, .. }));
        assert_eq!(error.details(), Some("Key (user_id) is not present"));
    }

    #[rstest]
    #[case("https://project.supabase.co", "https://project.supabase.co/rest/v1/feedbacks")]
    #[case("https://host.test/base", "https://host.test/base/rest/v1/feedbacks")]
    fn endpoints_resolve_under_the_project(#[case] raw: &str, #[case] expected: &str) {
        let client = SupabaseClient::new(
            &BackendCredentials::new(raw, "eyJkey"),
            &SupabaseOptions::default(),
            Arc::new(InMemoryLocalStore::default()),
            Arc::new(MutableClock::default()),
        )
        .expect("client builds");
        assert_eq!(
            client.endpoint("rest/v1/feedbacks").expect("joins").as_str(),
            expected
        );
    }

    #[rstest]
    fn sessions_are_restored_only_for_their_project() {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::default());
        let build = |url: &str| {
            SupabaseClient::new(
                &BackendCredentials::new(url, "eyJkey"),
                &SupabaseOptions::default(),
                store.clone(),
                Arc::new(MutableClock::default()),
            )
            .expect("client builds")
        };

        let first = build("https://one.supabase.co");
        first.set_session(Some(session_for("ada@example.com", None)));

        let same = build("https://one.supabase.co");
        let restored = same.session().expect("restored");
        assert_eq!(restored.user().email.as_deref(), Some("ada@example.com"));
        assert!(build("https://two.supabase.co").session().is_none());

        same.set_session(None);
        assert!(store.get(keys::SUPABASE_SESSION).expect("readable").is_none());
    }

    #[rstest]
    fn unparsable_urls_are_invalid_requests() {
        let error = SupabaseClient::new(
            &BackendCredentials::new("not a url", "eyJkey"),
            &SupabaseOptions::default(),
            Arc::new(InMemoryLocalStore::default()),
            Arc::new(MutableClock::default()),
        )
        .expect_err("rejected");
        assert!(matches!(error, BackendError::InvalidRequest { .. }));
    }
}
