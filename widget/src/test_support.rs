//! Test utilities for the widget crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for tests and when the `test-support` feature is enabled.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use tokio::sync::watch;
use url::Url;

use crate::domain::ports::{
    AttachmentStore, AuthGateway, BackendClient, BackendConnector, BackendCredentials,
    BackendError, FeedbackRepository, ProfileRepository,
};
use crate::domain::{
    Attachment, AuthOutcome, AuthUser, Credentials, FeedbackId, FeedbackInsert, FeedbackRecord,
    FeedbackUpdate, Profile, Role, Session, StoragePath, TrackingId, UserId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Fixed instant used by fixtures: 2026-03-14 09:26:53 UTC.
pub fn fixture_now() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).single() {
        Some(now) => now,
        None => panic!("fixture timestamp is valid"),
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        *lock(&self.0) += TimeDelta::milliseconds(millis);
    }
}

impl Default for MutableClock {
    fn default() -> Self {
        Self::new(fixture_now())
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Build a session for `email` expiring at `expires_at`.
pub fn session_for(email: &str, expires_at: Option<DateTime<Utc>>) -> Session {
    let user = AuthUser {
        id: UserId::random(),
        email: Some(email.to_owned()),
    };
    Session::new(
        format!("access-{}", user.id),
        format!("refresh-{}", user.id),
        expires_at,
        user,
    )
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Debug, Default)]
struct Failures {
    insert: Option<BackendError>,
    list: Option<BackendError>,
    update: Option<BackendError>,
    delete: Option<BackendError>,
    probe: Option<BackendError>,
    profile: Option<BackendError>,
    sign_out: Option<BackendError>,
    refresh: Option<BackendError>,
    uploads: HashMap<String, BackendError>,
}

/// In-memory stand-in for every backend surface.
///
/// Rows, uploads and accounts live in memory. Every call is appended to
/// [`Self::calls`] so tests can assert that nothing reached the backend.
#[derive(Debug)]
pub struct InMemoryBackend {
    rows: Mutex<Vec<FeedbackRecord>>,
    uploads: Mutex<Vec<(StoragePath, Attachment)>>,
    accounts: Mutex<BTreeMap<String, Account>>,
    profiles: Mutex<HashMap<UserId, Profile>>,
    session: watch::Sender<Option<Session>>,
    failures: Mutex<Failures>,
    calls: Mutex<Vec<&'static str>>,
    next_id: AtomicI64,
    refreshes: AtomicUsize,
    echo_tracking_id: Mutex<bool>,
    now: DateTime<Utc>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            rows: Mutex::default(),
            uploads: Mutex::default(),
            accounts: Mutex::default(),
            profiles: Mutex::default(),
            session,
            failures: Mutex::default(),
            calls: Mutex::default(),
            next_id: AtomicI64::new(1),
            refreshes: AtomicUsize::new(0),
            echo_tracking_id: Mutex::new(true),
            now: fixture_now(),
        }
    }
}

impl InMemoryBackend {
    /// Register an account with a profile of `role`.
    pub fn with_account(self, email: &str, password: &str, role: Option<Role>) -> Self {
        let user = AuthUser {
            id: UserId::random(),
            email: Some(email.to_owned()),
        };
        if let Some(role) = role {
            lock(&self.profiles).insert(user.id, Profile { id: user.id, role });
        }
        lock(&self.accounts).insert(
            email.to_owned(),
            Account {
                password: password.to_owned(),
                user,
            },
        );
        self
    }

    /// Replace the held session, notifying subscribers.
    pub fn set_session(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }

    /// Give `user_id` a profile.
    pub fn set_profile(&self, user_id: UserId, role: Role) {
        lock(&self.profiles).insert(user_id, Profile { id: user_id, role });
    }

    /// User id registered for `email`.
    pub fn user_id(&self, email: &str) -> Option<UserId> {
        lock(&self.accounts).get(email).map(|account| account.user.id)
    }

    /// Make the next inserts fail.
    pub fn fail_insert(&self, error: BackendError) {
        lock(&self.failures).insert = Some(error);
    }

    /// Make listing fail.
    pub fn fail_list(&self, error: BackendError) {
        lock(&self.failures).list = Some(error);
    }

    /// Make updates fail.
    pub fn fail_update(&self, error: BackendError) {
        lock(&self.failures).update = Some(error);
    }

    /// Make deletes fail.
    pub fn fail_delete(&self, error: BackendError) {
        lock(&self.failures).delete = Some(error);
    }

    /// Make probes fail.
    pub fn fail_probe(&self, error: BackendError) {
        lock(&self.failures).probe = Some(error);
    }

    /// Make profile lookups fail.
    pub fn fail_profile(&self, error: BackendError) {
        lock(&self.failures).profile = Some(error);
    }

    /// Make sign-out fail after clearing the session.
    pub fn fail_sign_out(&self, error: BackendError) {
        lock(&self.failures).sign_out = Some(error);
    }

    /// Make session refresh fail.
    pub fn fail_refresh(&self, error: BackendError) {
        lock(&self.failures).refresh = Some(error);
    }

    /// Make uploads of `name` fail.
    pub fn fail_upload(&self, name: &str, error: BackendError) {
        lock(&self.failures).uploads.insert(name.to_owned(), error);
    }

    /// Stop echoing the tracking id on insert.
    pub fn omit_tracking_id(&self) {
        *lock(&self.echo_tracking_id) = false;
    }

    /// Stored rows, oldest first.
    pub fn rows(&self) -> Vec<FeedbackRecord> {
        lock(&self.rows).clone()
    }

    /// Paths uploaded so far.
    pub fn uploaded_paths(&self) -> Vec<String> {
        lock(&self.uploads)
            .iter()
            .map(|(path, _)| path.as_str().to_owned())
            .collect()
    }

    /// Names of the port methods called so far.
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    /// Receivers currently following the session channel.
    pub fn session_followers(&self) -> usize {
        self.session.receiver_count()
    }

    /// Number of successful session refreshes.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn record(&self, call: &'static str) {
        lock(&self.calls).push(call);
    }

    fn issue_session(&self, user: AuthUser) -> Session {
        let sequence = self.refreshes.load(Ordering::SeqCst);
        Session::new(
            format!("access-{}-{sequence}", user.id),
            format!("refresh-{}-{sequence}", user.id),
            Some(self.now + TimeDelta::hours(1)),
            user,
        )
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryBackend {
    async fn insert(&self, row: &FeedbackInsert) -> Result<Option<TrackingId>, BackendError> {
        self.record("insert");
        tokio::task::yield_now().await;
        if let Some(error) = lock(&self.failures).insert.clone() {
            return Err(error);
        }
        let id = FeedbackId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = FeedbackRecord {
            id,
            created_at: self.now + TimeDelta::seconds(id.get()),
            title: row.title.clone(),
            description: row.description.clone(),
            feedback_type: row.feedback_type,
            severity: row.severity,
            email: row.email.clone(),
            name: row.name.clone(),
            status: row.status,
            tracking_id: row.tracking_id.clone(),
            attachment_names: row.attachment_names.clone(),
            user_id: row.user_id,
            current_route: Some(row.current_route.clone()),
            navigation_history: row.navigation_history.clone(),
        };
        lock(&self.rows).push(record);
        let echo = *lock(&self.echo_tracking_id);
        Ok(echo.then(|| row.tracking_id.clone()))
    }

    async fn list_newest_first(&self) -> Result<Vec<FeedbackRecord>, BackendError> {
        self.record("list");
        if let Some(error) = lock(&self.failures).list.clone() {
            return Err(error);
        }
        let mut rows = lock(&self.rows).clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update(&self, id: FeedbackId, update: &FeedbackUpdate) -> Result<(), BackendError> {
        self.record("update");
        if let Some(error) = lock(&self.failures).update.clone() {
            return Err(error);
        }
        for row in lock(&self.rows).iter_mut().filter(|row| row.id == id) {
            row.status = update.status;
            if update.severity.is_some() {
                row.severity = update.severity;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: FeedbackId) -> Result<(), BackendError> {
        self.record("delete");
        if let Some(error) = lock(&self.failures).delete.clone() {
            return Err(error);
        }
        lock(&self.rows).retain(|row| row.id != id);
        Ok(())
    }

    async fn probe(&self) -> Result<(), BackendError> {
        self.record("probe");
        tokio::task::yield_now().await;
        lock(&self.failures).probe.clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl AttachmentStore for InMemoryBackend {
    async fn upload(&self, path: &StoragePath, file: &Attachment) -> Result<(), BackendError> {
        self.record("upload");
        if let Some(error) = lock(&self.failures).uploads.get(file.name()).cloned() {
            return Err(error);
        }
        lock(&self.uploads).push((path.clone(), file.clone()));
        Ok(())
    }

    fn public_url(&self, path: &StoragePath) -> Result<Url, BackendError> {
        let raw = format!("https://fake.supabase.test/storage/v1/object/public/attachments/{path}");
        Url::parse(&raw).map_err(|error| BackendError::invalid_request(error.to_string()))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryBackend {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Profile>, BackendError> {
        self.record("profile");
        if let Some(error) = lock(&self.failures).profile.clone() {
            return Err(error);
        }
        Ok(lock(&self.profiles).get(&user_id).cloned())
    }
}

#[async_trait]
impl AuthGateway for InMemoryBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthOutcome, BackendError> {
        self.record("sign_up");
        let mut accounts = lock(&self.accounts);
        if accounts.contains_key(credentials.email()) {
            return Err(BackendError::rejected(422_u16, "User already registered", ""));
        }
        let user = AuthUser {
            id: UserId::random(),
            email: Some(credentials.email().to_owned()),
        };
        accounts.insert(
            credentials.email().to_owned(),
            Account {
                password: credentials.password().to_owned(),
                user: user.clone(),
            },
        );
        drop(accounts);
        lock(&self.profiles).insert(
            user.id,
            Profile {
                id: user.id,
                role: Role::Client,
            },
        );
        let session = self.issue_session(user.clone());
        self.session.send_replace(Some(session.clone()));
        Ok(AuthOutcome {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthOutcome, BackendError> {
        self.record("sign_in");
        let account = lock(&self.accounts)
            .get(credentials.email())
            .filter(|account| account.password == credentials.password())
            .cloned()
            .ok_or_else(|| BackendError::rejected(400_u16, "Invalid login credentials", ""))?;
        let session = self.issue_session(account.user.clone());
        self.session.send_replace(Some(session.clone()));
        Ok(AuthOutcome {
            user: Some(account.user),
            session: Some(session),
        })
    }

    async fn refresh_session(&self) -> Result<Session, BackendError> {
        self.record("refresh");
        if let Some(error) = lock(&self.failures).refresh.clone() {
            self.session.send_replace(None);
            return Err(error);
        }
        let current = self
            .session
            .borrow()
            .clone()
            .ok_or_else(|| BackendError::invalid_request("no session to refresh"))?;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let fresh = self.issue_session(current.user().clone());
        self.session.send_replace(Some(fresh.clone()));
        Ok(fresh)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record("sign_out");
        self.session.send_replace(None);
        lock(&self.failures).sign_out.clone().map_or(Ok(()), Err)
    }

    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

/// Connector that hands out clients backed by shared [`InMemoryBackend`]s.
///
/// Each distinct URL gets its own backend so tests can tell handles apart.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    backends: Mutex<HashMap<String, Arc<InMemoryBackend>>>,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    /// Pre-register the backend served for `url`.
    pub fn with_backend(self, url: &str, backend: Arc<InMemoryBackend>) -> Self {
        lock(&self.backends).insert(url.to_owned(), backend);
        self
    }

    /// Backend served for `url`, created on demand.
    pub fn backend(&self, url: &str) -> Arc<InMemoryBackend> {
        lock(&self.backends)
            .entry(url.to_owned())
            .or_insert_with(|| Arc::new(InMemoryBackend::default()))
            .clone()
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl BackendConnector for InMemoryConnector {
    fn connect(&self, credentials: &BackendCredentials) -> Result<BackendClient, BackendError> {
        Url::parse(credentials.url())
            .map_err(|error| BackendError::invalid_request(error.to_string()))?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(BackendClient::from_shared(self.backend(credentials.url())))
    }
}
