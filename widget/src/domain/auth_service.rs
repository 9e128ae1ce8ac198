//! Session and profile state that follows the configured backend.
//!
//! A supervisor task watches the provider. For every handle it publishes the
//! handle's session, fetches the matching profile and then follows the
//! handle's session stream until the handle is replaced. Dropping the
//! service aborts the task and with it the stream subscription.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend_provider::{BackendHandle, BackendProvider, SharedHandle};
use super::{AuthOutcome, Credentials, Error, Profile, Role, Session, UserId};

/// Published session and profile.
#[derive(Debug)]
struct AuthState {
    session: watch::Sender<Option<Session>>,
    profile: watch::Sender<Option<Profile>>,
}

impl AuthState {
    fn new() -> Self {
        let (session, _) = watch::channel(None);
        let (profile, _) = watch::channel(None);
        Self { session, profile }
    }

    fn publish_session(&self, next: Option<Session>) {
        self.session.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn publish_profile(&self, next: Option<Profile>) {
        self.profile.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn session_user(&self) -> Option<UserId> {
        self.session.borrow().as_ref().map(|session| session.user().id)
    }

    fn reset(&self) {
        self.publish_session(None);
        self.publish_profile(None);
    }
}

/// Authentication façade with derived role flags.
#[derive(Debug)]
pub struct AuthService {
    provider: Arc<BackendProvider>,
    state: Arc<AuthState>,
    supervisor: JoinHandle<()>,
}

impl AuthService {
    /// Publish the current handle's session and start following the provider.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(provider: Arc<BackendProvider>, clock: Arc<dyn Clock>) -> Self {
        let state = Arc::new(AuthState::new());
        if let Some(handle) = provider.current() {
            state.publish_session(handle.client().auth.current_session());
        }
        let supervisor = tokio::spawn(supervise(provider.subscribe(), state.clone(), clock));
        Self {
            provider,
            state,
            supervisor,
        }
    }

    /// Current session.
    pub fn session(&self) -> Option<Session> {
        self.state.session.borrow().clone()
    }

    /// Cached profile for the current session.
    pub fn profile(&self) -> Option<Profile> {
        self.state.profile.borrow().clone()
    }

    /// Follow session changes.
    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.state.session.subscribe()
    }

    /// Follow profile changes.
    pub fn subscribe_profile(&self) -> watch::Receiver<Option<Profile>> {
        self.state.profile.subscribe()
    }

    /// Return true when the cached profile has the admin role.
    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::Admin)
    }

    /// Return true when the cached profile has the client role.
    pub fn is_client(&self) -> bool {
        self.has_role(&Role::Client)
    }

    fn has_role(&self, role: &Role) -> bool {
        self.state
            .profile
            .borrow()
            .as_ref()
            .is_some_and(|profile| &profile.role == role)
    }

    /// Register an account and, when a user comes back, load its profile.
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<AuthOutcome, Error> {
        let handle = self.require_handle()?;
        let outcome = handle
            .client()
            .auth
            .sign_up(credentials)
            .await
            .map_err(|error| {
                warn!(%error, email = credentials.email(), "sign-up failed");
                Error::from_backend(&error)
            })?;
        self.accept_outcome(&handle, &outcome).await;
        Ok(outcome)
    }

    /// Sign in and load the user's profile.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<AuthOutcome, Error> {
        let handle = self.require_handle()?;
        let outcome = handle
            .client()
            .auth
            .sign_in(credentials)
            .await
            .map_err(|error| {
                warn!(%error, email = credentials.email(), "sign-in failed");
                Error::from_backend(&error)
            })?;
        self.accept_outcome(&handle, &outcome).await;
        Ok(outcome)
    }

    /// Sign out. Session and profile are cleared locally even when the
    /// backend call fails.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let handle = self.require_handle()?;
        let result = handle.client().auth.sign_out().await;
        self.state.reset();
        result.map_err(|error| {
            warn!(%error, "sign-out failed");
            Error::from_backend(&error)
        })
    }

    /// Fetch and cache the profile for `user_id` using the current handle.
    pub async fn fetch_profile(&self, user_id: UserId) -> Option<Profile> {
        let handle = self.provider.current()?;
        let profile = load_profile(&handle, user_id).await;
        self.state.publish_profile(profile.clone());
        profile
    }

    fn require_handle(&self) -> Result<Arc<BackendHandle>, Error> {
        self.provider.current().ok_or_else(Error::not_configured)
    }

    async fn accept_outcome(&self, handle: &BackendHandle, outcome: &AuthOutcome) {
        if let Some(session) = &outcome.session {
            self.state.publish_session(Some(session.clone()));
        }
        if let Some(user) = &outcome.user {
            let profile = load_profile(handle, user.id).await;
            self.state.publish_profile(profile);
        }
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

async fn load_profile(handle: &BackendHandle, user_id: UserId) -> Option<Profile> {
    match handle.client().profiles.find_by_user_id(user_id).await {
        Ok(profile) => profile,
        Err(error) => {
            warn!(
                message = error.message(),
                details = error.details().unwrap_or_default(),
                %user_id,
                "failed to fetch profile"
            );
            None
        }
    }
}

async fn supervise(
    mut handles: watch::Receiver<SharedHandle>,
    state: Arc<AuthState>,
    clock: Arc<dyn Clock>,
) {
    loop {
        let current = handles.borrow_and_update().clone();
        let provider_alive = match current {
            Some(handle) => follow_handle(&handle, &mut handles, &state, clock.as_ref()).await,
            None => {
                state.reset();
                handles.changed().await.is_ok()
            }
        };
        if !provider_alive {
            debug!("backend provider dropped; auth supervisor exiting");
            return;
        }
    }
}

/// Follow one handle until the provider replaces it. Returns false once the
/// provider is gone.
async fn follow_handle(
    handle: &BackendHandle,
    handles: &mut watch::Receiver<SharedHandle>,
    state: &AuthState,
    clock: &dyn Clock,
) -> bool {
    let auth = handle.client().auth.clone();
    let mut sessions = auth.subscribe();
    let mut session = sessions.borrow_and_update().clone();

    if session.as_ref().is_some_and(|s| s.is_expired(clock.utc())) {
        session = match auth.refresh_session().await {
            Ok(fresh) => {
                info!(generation = handle.generation(), "refreshed expired session");
                Some(fresh)
            }
            Err(error) => {
                warn!(%error, "could not refresh expired session");
                None
            }
        };
        sessions.mark_unchanged();
    }
    publish_with_profile(handle, session, state).await;

    loop {
        tokio::select! {
            changed = handles.changed() => return changed.is_ok(),
            changed = sessions.changed() => {
                if changed.is_err() {
                    return handles.changed().await.is_ok();
                }
                let next = sessions.borrow_and_update().clone();
                publish_with_profile(handle, next, state).await;
            }
        }
    }
}

async fn publish_with_profile(handle: &BackendHandle, session: Option<Session>, state: &AuthState) {
    let user_id = session.as_ref().map(|s| s.user().id);
    state.publish_session(session);
    let Some(user_id) = user_id else {
        state.publish_profile(None);
        return;
    };
    let profile = load_profile(handle, user_id).await;
    if state.session_user() == Some(user_id) {
        state.publish_profile(profile);
    }
}
