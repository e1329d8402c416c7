//! Domain-level error types.
//!
//! These errors are transport agnostic. Presentation code maps them to
//! user-facing notifications; adapters never leak their own error types past
//! the service layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Client-side validation of the supplied values failed.
    Validation,
    /// The backend rejected the credentials or the identity operation.
    Auth,
    /// The operation requires a signed-in user and none is present.
    NotAuthenticated,
    /// The profile row could not be created or verified during sign-up.
    ProfileCreation,
    /// The backend refused a profile write.
    ProfileUpdate,
    /// The profile row is missing or unreadable.
    Profile,
    /// The write would violate a uniqueness rule.
    Conflict,
    /// The requested record does not exist.
    NotFound,
    /// The backend could not be reached.
    Network,
    /// An unexpected error occurred inside the client.
    Internal,
}

impl ErrorCode {
    const fn fallback_message(self) -> &'static str {
        match self {
            Self::Validation => "invalid input",
            Self::Auth => "authentication failed",
            Self::NotAuthenticated => "no user logged in",
            Self::ProfileCreation => "failed to create user profile",
            Self::ProfileUpdate => "failed to update user profile",
            Self::Profile => "user profile unavailable",
            Self::Conflict => "record already exists",
            Self::NotFound => "record not found",
            Self::Network => "backend unavailable",
            Self::Internal => "internal error",
        }
    }
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use booking_client::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::NotFound, "missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValidationError {
    /// The message was blank.
    EmptyMessage,
}

impl std::fmt::Display for ErrorValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "error message must not be empty"),
        }
    }
}

impl std::error::Error for ErrorValidationError {}

impl Error {
    /// Create a new error.
    ///
    /// A blank message is replaced with the code's generic description so the
    /// invariant holds without panicking.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(ErrorValidationError::EmptyMessage) => Self {
                code,
                message: code.fallback_message().to_owned(),
                details: None,
            },
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message suitable for a notification.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use booking_client::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::validation("bad").with_details(json!({ "field": "name" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Convenience constructor for [`ErrorCode::Auth`].
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Auth, message)
    }

    /// Convenience constructor for [`ErrorCode::NotAuthenticated`].
    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated, "No user logged in")
    }

    /// Convenience constructor for [`ErrorCode::ProfileCreation`].
    pub fn profile_creation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProfileCreation, message)
    }

    /// Convenience constructor for [`ErrorCode::ProfileUpdate`].
    pub fn profile_update(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProfileUpdate, message)
    }

    /// Convenience constructor for [`ErrorCode::Profile`].
    pub fn profile(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Profile, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Network`].
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    /// Convenience constructor for [`ErrorCode::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Error::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}
