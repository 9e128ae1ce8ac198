//! DTOs for the hosted backend's REST, auth and storage payloads.
//!
//! Responses decode into these transport types first and are mapped into
//! domain records in one pass.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AuthOutcome, AuthUser, FeedbackId, FeedbackInsert, FeedbackRecord, FeedbackSeverity,
    FeedbackStatus, FeedbackType, FeedbackUpdate, Profile, Role, Session, TrackingId, UserId,
};

#[derive(Debug, Serialize)]
pub(super) struct FeedbackInsertDto<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    feedback_type: FeedbackType,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<FeedbackSeverity>,
    email: Option<&'a str>,
    name: Option<&'a str>,
    attachment_names: &'a [String],
    status: FeedbackStatus,
    tracking_id: &'a TrackingId,
    user_id: Option<UserId>,
    current_route: &'a str,
    navigation_history: &'a [String],
}

impl<'a> From<&'a FeedbackInsert> for FeedbackInsertDto<'a> {
    fn from(row: &'a FeedbackInsert) -> Self {
        Self {
            title: row.title.as_str(),
            description: row.description.as_str(),
            feedback_type: row.feedback_type,
            severity: row.severity,
            email: row.email.as_deref(),
            name: row.name.as_deref(),
            attachment_names: row.attachment_names.as_slice(),
            status: row.status,
            tracking_id: &row.tracking_id,
            user_id: row.user_id,
            current_route: row.current_route.as_str(),
            navigation_history: row.navigation_history.as_slice(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FeedbackUpdateDto {
    status: FeedbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<FeedbackSeverity>,
}

impl From<&FeedbackUpdate> for FeedbackUpdateDto {
    fn from(update: &FeedbackUpdate) -> Self {
        Self {
            status: update.status,
            severity: update.severity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TrackingIdRowDto {
    pub(super) tracking_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeedbackRowDto {
    id: i64,
    created_at: DateTime<Utc>,
    #[serde(default)]
    title: Option<String>,
    description: String,
    #[serde(rename = "type")]
    feedback_type: FeedbackType,
    #[serde(default)]
    severity: Option<FeedbackSeverity>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    status: FeedbackStatus,
    tracking_id: String,
    #[serde(default)]
    attachment_names: Option<Vec<String>>,
    #[serde(default)]
    user_id: Option<Uuid>,
    #[serde(default)]
    current_route: Option<String>,
    #[serde(default)]
    navigation_history: Option<Vec<String>>,
}

impl From<FeedbackRowDto> for FeedbackRecord {
    fn from(row: FeedbackRowDto) -> Self {
        Self {
            id: FeedbackId::new(row.id),
            created_at: row.created_at,
            title: row.title.unwrap_or_default(),
            description: row.description,
            feedback_type: row.feedback_type,
            severity: row.severity,
            email: row.email,
            name: row.name,
            status: row.status,
            tracking_id: TrackingId::new(row.tracking_id),
            attachment_names: row.attachment_names.unwrap_or_default(),
            user_id: row.user_id.map(UserId::from_uuid),
            current_route: row.current_route,
            navigation_history: row.navigation_history.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileRowDto {
    id: Uuid,
    role: String,
}

impl From<ProfileRowDto> for Profile {
    fn from(row: ProfileRowDto) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            role: Role::from_column(&row.role),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PasswordGrantDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshGrantDto<'a> {
    pub(super) refresh_token: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct UserDto {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserDto> for AuthUser {
    fn from(user: UserDto) -> Self {
        Self {
            id: UserId::from_uuid(user.id),
            email: user.email,
        }
    }
}

impl From<&AuthUser> for UserDto {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email.clone(),
        }
    }
}

/// Auth endpoints answer with a session, or with a bare user when sign-up
/// awaits email confirmation.
#[derive(Debug, Deserialize)]
pub(super) struct AuthResponseDto {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<UserDto>,
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    email: Option<String>,
}

impl AuthResponseDto {
    pub(super) fn into_outcome(self, now: DateTime<Utc>) -> Result<AuthOutcome, String> {
        let user = match (self.user, self.id) {
            (Some(user), _) => Some(AuthUser::from(user)),
            (None, Some(id)) => Some(AuthUser {
                id: UserId::from_uuid(id),
                email: self.email,
            }),
            (None, None) => None,
        };
        let session = match self.access_token {
            Some(access_token) => {
                let owner = user
                    .clone()
                    .ok_or_else(|| "session response is missing its user".to_owned())?;
                let expires_at = self
                    .expires_at
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .or_else(|| {
                        self.expires_in
                            .map(|secs| now + TimeDelta::seconds(secs))
                    });
                Some(Session::new(
                    access_token,
                    self.refresh_token.unwrap_or_default(),
                    expires_at,
                    owner,
                ))
            }
            None => None,
        };
        Ok(AuthOutcome { user, session })
    }
}

/// Session as persisted in the local store, tagged with the project that
/// issued it.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StoredSessionDto {
    pub(super) project_url: String,
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    user: UserDto,
}

impl StoredSessionDto {
    pub(super) fn new(project_url: &str, session: &Session) -> Self {
        Self {
            project_url: project_url.to_owned(),
            access_token: session.access_token().to_owned(),
            refresh_token: session.refresh_token().to_owned(),
            expires_at: session.expires_at(),
            user: UserDto::from(session.user()),
        }
    }

    pub(super) fn into_session(self) -> Session {
        Session::new(
            self.access_token,
            self.refresh_token,
            self.expires_at,
            AuthUser::from(self.user),
        )
    }
}

/// Error bodies from PostgREST, GoTrue and the storage API all differ; the
/// first populated field wins.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl ErrorBodyDto {
    pub(super) fn into_parts(self) -> (Option<String>, Option<String>) {
        let message = [self.message, self.msg, self.error_description, self.error]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty());
        let details = [self.details, self.hint]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty());
        (message, details)
    }
}
