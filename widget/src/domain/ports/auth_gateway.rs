//! Driven port for the backend's auth service.
//!
//! The adapter owns the session: it stores the latest one, attaches its
//! access token to every request and publishes changes through a
//! [`watch`] channel.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{AuthOutcome, Credentials, Session};

use super::BackendError;

/// Sign-up, sign-in and session lifecycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Register a new account.
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthOutcome, BackendError>;

    /// Exchange email and password for a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthOutcome, BackendError>;

    /// Swap the held session for a fresh one using its refresh token.
    async fn refresh_session(&self) -> Result<Session, BackendError>;

    /// Revoke the held session. The local session is cleared either way.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Session held right now.
    fn current_session(&self) -> Option<Session>;

    /// Follow session changes.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}
