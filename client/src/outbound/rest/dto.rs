//! DTOs for the hosted backend's auth, row and error payloads.
//!
//! Responses decode into these transport shapes first and are then mapped to
//! domain values in one pass.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BookingDraft, Email, NewPhoneNumber, PhoneType, Session, UserId};

#[derive(Debug, Serialize)]
pub(super) struct PasswordGrantDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) data: SignUpMetadataDto<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpMetadataDto<'a> {
    pub(super) name: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshGrantDto<'a> {
    pub(super) refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthUserDto {
    pub(super) id: String,
    #[serde(default)]
    pub(super) email: Option<String>,
}

/// Token responses carry a `user`; unconfirmed sign-ups return the user
/// object itself.
#[derive(Debug, Deserialize)]
pub(super) struct AuthResponseDto {
    #[serde(default)]
    pub(super) access_token: Option<String>,
    #[serde(default)]
    pub(super) refresh_token: Option<String>,
    #[serde(default)]
    pub(super) expires_in: Option<i64>,
    #[serde(default)]
    pub(super) user: Option<AuthUserDto>,
    #[serde(default)]
    pub(super) id: Option<String>,
    #[serde(default)]
    pub(super) email: Option<String>,
}

impl AuthResponseDto {
    pub(super) fn into_domain(self, now: DateTime<Utc>) -> Result<(UserId, Option<Session>), String> {
        let (raw_id, raw_email) = match self.user {
            Some(user) => (user.id, user.email),
            None => (
                self.id.ok_or_else(|| "auth response carries no user id".to_owned())?,
                self.email,
            ),
        };
        let user_id = UserId::new(&raw_id).map_err(|err| format!("invalid user id: {err}"))?;
        let email = raw_email.and_then(|value| Email::new(value).ok());

        let session = match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) => Some(Session::new(
                user_id.clone(),
                email,
                access,
                refresh,
                self.expires_in.map(|secs| now + Duration::seconds(secs)),
            )),
            _ => None,
        };
        Ok((user_id, session))
    }
}

/// Error body shapes returned by the auth and row endpoints.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    pub(super) msg: Option<String>,
    #[serde(default)]
    pub(super) message: Option<String>,
    #[serde(default)]
    pub(super) error_description: Option<String>,
    #[serde(default)]
    pub(super) error: Option<String>,
    #[serde(default)]
    pub(super) code: Option<serde_json::Value>,
    #[serde(default)]
    pub(super) error_code: Option<String>,
}

impl ErrorBodyDto {
    pub(super) fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Most specific human-readable message, if any.
    pub(super) fn message(&self) -> Option<&str> {
        [
            &self.msg,
            &self.error_description,
            &self.message,
            &self.error,
        ]
        .into_iter()
        .find_map(|field| field.as_deref())
    }

    /// Machine-readable code as text.
    pub(super) fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| {
            self.code.as_ref().map(|value| match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            })
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct NewPhoneRowDto<'a> {
    pub(super) user_id: &'a UserId,
    pub(super) country_code: Option<&'a str>,
    pub(super) phone_number: &'a str,
    pub(super) phone_type: PhoneType,
}

impl<'a> NewPhoneRowDto<'a> {
    pub(super) fn new(user_id: &'a UserId, phone: &'a NewPhoneNumber) -> Self {
        Self {
            user_id,
            country_code: phone.country_code(),
            phone_number: phone.phone_number(),
            phone_type: phone.phone_type(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct BookingRowDto<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) user_id: Option<&'a UserId>,
    #[serde(flatten)]
    pub(super) draft: &'a BookingDraft,
    pub(super) updated_at: DateTime<Utc>,
}
