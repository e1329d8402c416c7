//! Authentication primitives: credentials, sessions and auth-state changes.
//!
//! Keep raw form input outside the domain by exposing constructors that
//! validate strings before a service talks to the auth backend.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::domain::user::{Email, UserId, UserValidationError};

/// Minimum accepted password length.
pub const PASSWORD_MIN: usize = 6;

/// Domain error returned when credential values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsValidationError {
    /// The email was missing or malformed.
    Email(UserValidationError),
    /// Password was blank.
    EmptyPassword,
    /// Password was shorter than [`PASSWORD_MIN`].
    PasswordTooShort {
        /// Minimum permitted length.
        min: usize,
    },
}

impl fmt::Display for CredentialsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(err) => write!(f, "{err}"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
        }
    }
}

impl std::error::Error for CredentialsValidationError {}

/// Validated email/password pair used by the auth backend.
///
/// ## Invariants
/// - `email` is normalised by [`Email::new`].
/// - `password` is non-empty; caller whitespace is preserved. Credentials
///   built by [`Credentials::try_from_parts`] are also at least
///   [`PASSWORD_MIN`] characters.
///
/// # Examples
/// ```
/// use booking_client::domain::Credentials;
///
/// let creds = Credentials::try_from_parts("A@B.com", "Secret123").unwrap();
/// assert_eq!(creds.email().as_ref(), "a@b.com");
/// assert_eq!(creds.password(), "Secret123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: Email,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Construct credentials for a new account from raw email/password
    /// inputs, enforcing [`PASSWORD_MIN`].
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let credentials = Self::for_sign_in(email, password)?;
        if password.chars().count() < PASSWORD_MIN {
            return Err(CredentialsValidationError::PasswordTooShort { min: PASSWORD_MIN });
        }
        Ok(credentials)
    }

    /// Construct credentials for an existing account.
    ///
    /// Only the email shape and a non-empty password are checked; the
    /// password policy is the backend's to enforce.
    pub fn for_sign_in(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let normalized = Email::new(email).map_err(CredentialsValidationError::Email)?;
        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }
        Ok(Self {
            email: normalized,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Password string provided by the caller.
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

/// Backend-issued proof of an authenticated identity.
///
/// Only the user id is meaningful to the domain; tokens are carried for the
/// adapter that issued them and are redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    email: Option<Email>,
    access_token: Zeroizing<String>,
    refresh_token: Zeroizing<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from its parts.
    pub fn new(
        user_id: UserId,
        email: Option<Email>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            email,
            access_token: Zeroizing::new(access_token.into()),
            refresh_token: Zeroizing::new(refresh_token.into()),
            expires_at,
        }
    }

    /// Identity the session belongs to.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Email recorded on the identity, when the backend returned one.
    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// Bearer token for authenticated backend calls.
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// Token used by the backend client to renew the session.
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.as_str()
    }

    /// Expiry instant, when known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Kind of auth-state notification pushed by the backend client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Session resolved once at startup.
    InitialSession,
    /// A user signed in or signed up.
    SignedIn,
    /// The session ended.
    SignedOut,
    /// The backend renewed the access token.
    TokenRefreshed,
    /// Identity metadata changed.
    UserUpdated,
}

/// One auth-state notification: the event and the session after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    /// What happened.
    pub event: AuthEvent,
    /// Session in force after the event, if any.
    pub session: Option<Session>,
}

impl AuthChange {
    /// Convenience constructor.
    pub fn new(event: AuthEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    /// Notification emitted when the session ends.
    pub fn signed_out() -> Self {
        Self::new(AuthEvent::SignedOut, None)
    }
}

/// Result of a backend sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    /// Identity created or authenticated.
    pub user_id: UserId,
    /// Session issued, absent when sign-up awaits email confirmation.
    pub session: Option<Session>,
}
