//! `AuthBackend` over the hosted identity endpoints.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use super::backend::{HttpFailure, RestBackend};
use super::dto::{AuthResponseDto, PasswordGrantDto, RefreshGrantDto, SignUpDto, SignUpMetadataDto};
use crate::domain::ports::{AuthBackend, AuthBackendError, AuthSubscription};
use crate::domain::{AuthChange, AuthEvent, AuthResponse, Credentials, DisplayName, Session};

const SIGN_UP_PATH: &str = "auth/v1/signup";
const TOKEN_PATH: &str = "auth/v1/token";
const LOGOUT_PATH: &str = "auth/v1/logout";

pub(super) fn map_auth_failure(failure: HttpFailure) -> AuthBackendError {
    match failure {
        HttpFailure::Transport(message) | HttpFailure::Timeout(message) => {
            AuthBackendError::transport(message)
        }
        HttpFailure::Decode(message) => AuthBackendError::rejected(message),
        HttpFailure::Status {
            status,
            message,
            code,
        } => {
            let lowered = message.to_ascii_lowercase();
            if lowered.contains("already registered") || code.as_deref() == Some("user_already_exists") {
                AuthBackendError::email_taken(message)
            } else if status == StatusCode::UNAUTHORIZED
                || lowered.contains("invalid login credentials")
                || code.as_deref() == Some("invalid_credentials")
            {
                AuthBackendError::invalid_credentials(message)
            } else if status.is_client_error() {
                AuthBackendError::rejected(message)
            } else {
                AuthBackendError::transport(message)
            }
        }
    }
}

impl RestBackend {
    async fn token_grant<B>(&self, grant_type: &str, body: &B) -> Result<AuthResponse, AuthBackendError>
    where
        B: serde::Serialize + Sync,
    {
        let mut url = self.endpoint(TOKEN_PATH).map_err(map_auth_failure)?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let builder = self.request(Method::POST, url).await.json(body);
        let dto: AuthResponseDto = self.execute(builder).await.map_err(map_auth_failure)?;
        into_response(dto, self.clock.utc())
    }

    async fn install(&self, event: AuthEvent, session: Option<Session>) {
        *self.session.write().await = session.clone();
        self.hub.emit(AuthChange::new(event, session));
    }

    /// Exchange the refresh token for a new session.
    async fn refresh(&self, session: &Session) -> Result<Session, AuthBackendError> {
        let response = self
            .token_grant(
                "refresh_token",
                &RefreshGrantDto {
                    refresh_token: session.refresh_token(),
                },
            )
            .await?;
        response
            .session
            .ok_or_else(|| AuthBackendError::rejected("refresh returned no session"))
    }
}

fn into_response(dto: AuthResponseDto, now: chrono::DateTime<chrono::Utc>) -> Result<AuthResponse, AuthBackendError> {
    let (user_id, session) = dto.into_domain(now).map_err(AuthBackendError::rejected)?;
    Ok(AuthResponse { user_id, session })
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn get_session(&self) -> Result<Option<Session>, AuthBackendError> {
        let Some(current) = self.session.read().await.clone() else {
            return Ok(None);
        };
        let expired = current
            .expires_at()
            .is_some_and(|expires_at| expires_at <= self.clock.utc());
        if !expired {
            return Ok(Some(current));
        }

        debug!(user_id = %current.user_id(), "session expired; refreshing");
        match self.refresh(&current).await {
            Ok(renewed) => {
                self.install(AuthEvent::TokenRefreshed, Some(renewed.clone()))
                    .await;
                Ok(Some(renewed))
            }
            Err(AuthBackendError::Transport { message }) => {
                Err(AuthBackendError::transport(message))
            }
            Err(error) => {
                warn!(error = %error, "session refresh rejected; signing out locally");
                self.install(AuthEvent::SignedOut, None).await;
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        self.hub.subscribe()
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        name: &DisplayName,
    ) -> Result<AuthResponse, AuthBackendError> {
        let url = self.endpoint(SIGN_UP_PATH).map_err(map_auth_failure)?;
        let body = SignUpDto {
            email: credentials.email().as_ref(),
            password: credentials.password(),
            data: SignUpMetadataDto {
                name: name.as_ref(),
            },
        };
        let builder = self.request(Method::POST, url).await.json(&body);
        let dto: AuthResponseDto = self.execute(builder).await.map_err(map_auth_failure)?;
        let response = into_response(dto, self.clock.utc())?;
        if let Some(session) = &response.session {
            self.install(AuthEvent::SignedIn, Some(session.clone())).await;
        }
        Ok(response)
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthResponse, AuthBackendError> {
        let body = PasswordGrantDto {
            email: credentials.email().as_ref(),
            password: credentials.password(),
        };
        let response = self.token_grant("password", &body).await?;
        let Some(session) = response.session.clone() else {
            return Err(AuthBackendError::rejected("sign-in returned no session"));
        };
        self.install(AuthEvent::SignedIn, Some(session)).await;
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), AuthBackendError> {
        if self.session.read().await.is_none() {
            self.hub.emit(AuthChange::signed_out());
            return Ok(());
        }
        let url = self.endpoint(LOGOUT_PATH).map_err(map_auth_failure)?;
        let builder = self.request(Method::POST, url).await;
        match self.execute_empty(builder).await {
            Ok(()) => {}
            // The token is already invalid server-side.
            Err(HttpFailure::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND => {}
            Err(failure) => return Err(map_auth_failure(failure)),
        }
        self.install(AuthEvent::SignedOut, None).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for auth status mapping.
    use super::*;
    use rstest::rstest;

    fn status(status: StatusCode, message: &str, code: Option<&str>) -> HttpFailure {
        HttpFailure::Status {
            status,
            message: message.to_owned(),
            code: code.map(str::to_owned),
        }
    }

    #[rstest]
    #[case::taken(status(StatusCode::UNPROCESSABLE_ENTITY, "User already registered", None), "EmailTaken")]
    #[case::taken_by_code(status(StatusCode::BAD_REQUEST, "exists", Some("user_already_exists")), "EmailTaken")]
    #[case::bad_password(status(StatusCode::BAD_REQUEST, "Invalid login credentials", Some("invalid_credentials")), "InvalidCredentials")]
    #[case::unauthorised(status(StatusCode::UNAUTHORIZED, "JWT expired", None), "InvalidCredentials")]
    #[case::weak(status(StatusCode::UNPROCESSABLE_ENTITY, "Password should be at least 6 characters", None), "Rejected")]
    #[case::server(status(StatusCode::BAD_GATEWAY, "upstream", None), "Transport")]
    #[case::timeout(HttpFailure::Timeout("timed out".to_owned()), "Transport")]
    fn maps_auth_failures(#[case] failure: HttpFailure, #[case] expected: &str) {
        let error = map_auth_failure(failure);
        let actual = match error {
            AuthBackendError::EmailTaken { .. } => "EmailTaken",
            AuthBackendError::InvalidCredentials { .. } => "InvalidCredentials",
            AuthBackendError::Rejected { .. } => "Rejected",
            AuthBackendError::Transport { .. } => "Transport",
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn backend_message_is_preserved() {
        let error = map_auth_failure(status(
            StatusCode::BAD_REQUEST,
            "Invalid login credentials",
            None,
        ));
        assert_eq!(
            error,
            AuthBackendError::invalid_credentials("Invalid login credentials")
        );
    }
}
