//! Session lifecycle through the auth endpoint.

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::watch;
use tracing::{debug, info};

use super::SupabaseClient;
use super::dto::{AuthResponseDto, PasswordGrantDto, RefreshGrantDto};
use crate::domain::ports::{AuthGateway, BackendError};
use crate::domain::{AuthOutcome, Credentials, Session};

const SIGN_UP: &str = "auth/v1/signup";
const PASSWORD_GRANT: &str = "auth/v1/token?grant_type=password";
const REFRESH_GRANT: &str = "auth/v1/token?grant_type=refresh_token";
const LOGOUT: &str = "auth/v1/logout";

impl SupabaseClient {
    async fn exchange(&self, path: &str, body: &impl serde::Serialize) -> Result<AuthOutcome, BackendError> {
        let url = self.endpoint(path)?;
        let response: AuthResponseDto = self
            .send_json(self.anonymous(Method::POST, url).json(body))
            .await?;
        let outcome = response
            .into_outcome(self.clock.utc())
            .map_err(BackendError::decode)?;
        if let Some(session) = &outcome.session {
            self.set_session(Some(session.clone()));
        }
        Ok(outcome)
    }
}

fn password_grant(credentials: &Credentials) -> PasswordGrantDto<'_> {
    PasswordGrantDto {
        email: credentials.email(),
        password: credentials.password(),
    }
}

#[async_trait]
impl AuthGateway for SupabaseClient {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthOutcome, BackendError> {
        let outcome = self.exchange(SIGN_UP, &password_grant(credentials)).await?;
        if outcome.session.is_none() {
            info!(email = credentials.email(), "sign-up awaits email confirmation");
        }
        Ok(outcome)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthOutcome, BackendError> {
        self.exchange(PASSWORD_GRANT, &password_grant(credentials))
            .await
    }

    async fn refresh_session(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .session()
            .map(|session| session.refresh_token().to_owned())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| BackendError::invalid_request("no session to refresh"))?;
        let result = self
            .exchange(
                REFRESH_GRANT,
                &RefreshGrantDto {
                    refresh_token: &refresh_token,
                },
            )
            .await;
        match result {
            Ok(AuthOutcome {
                session: Some(session),
                ..
            }) => Ok(session),
            Ok(_) => Err(BackendError::decode("refresh response carried no session")),
            Err(error) => {
                if matches!(error, BackendError::Rejected { .. }) {
                    debug!("refresh token rejected; dropping session");
                    self.set_session(None);
                }
                Err(error)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.session().is_none() {
            return Ok(());
        }
        let result = match self.endpoint(LOGOUT) {
            Ok(url) => self.send(self.request(Method::POST, url)).await.map(drop),
            Err(error) => Err(error),
        };
        self.set_session(None);
        result
    }

    fn current_session(&self) -> Option<Session> {
        self.session()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_channel()
    }
}
