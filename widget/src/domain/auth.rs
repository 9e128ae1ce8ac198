//! Authentication primitives: credentials, sessions and profiles.
//!
//! Sessions are issued by the backend's auth service; this module only models
//! what the client keeps hold of. Secrets are wrapped in [`Zeroizing`] and
//! redacted from `Debug` output.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Validation errors returned by [`Credentials::try_from_parts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for CredentialsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for CredentialsValidationError {}

/// Email/password pair used to sign up or sign in.
///
/// ## Invariants
/// - `email` is trimmed and non-empty.
/// - `password` is non-empty and kept verbatim.
///
/// # Examples
/// ```
/// use feedback_widget::domain::Credentials;
///
/// let creds = Credentials::try_from_parts(" ada@example.com ", "hunter22").unwrap();
/// assert_eq!(creds.email(), "ada@example.com");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Construct credentials from raw inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let normalized = email.trim();
        if normalized.is_empty() {
            return Err(CredentialsValidationError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }
        Ok(Self {
            email: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Email address.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password as provided.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Stable user identifier issued by the auth backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// The signed-in user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Backend user id.
    pub id: UserId,
    /// Email address, when the account has one.
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access_token: Zeroizing<String>,
    refresh_token: Zeroizing<String>,
    expires_at: Option<DateTime<Utc>>,
    user: AuthUser,
}

impl Session {
    /// Assemble a session from its parts.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        user: AuthUser,
    ) -> Self {
        Self {
            access_token: Zeroizing::new(access_token.into()),
            refresh_token: Zeroizing::new(refresh_token.into()),
            expires_at,
            user,
        }
    }

    /// Bearer token for authenticated requests.
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// Token used to obtain a fresh session.
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.as_str()
    }

    /// Expiry instant, if the backend reported one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Session owner.
    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    /// Return true once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Result of a sign-up or sign-in call.
///
/// Sign-up may return a user without a session when the project requires
/// email confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOutcome {
    /// The affected user.
    pub user: Option<AuthUser>,
    /// The issued session.
    pub session: Option<Session>,
}

/// Role stored on the profile row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// May use the admin dashboard.
    Admin,
    /// Regular widget user.
    Client,
    /// Any other value found in the table.
    Other(String),
}

impl Role {
    /// Parse the stored column value.
    pub fn from_column(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "client" => Self::Client,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Column value for this role.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile row keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Owning user.
    pub id: UserId,
    /// Assigned role.
    pub role: Role,
}
