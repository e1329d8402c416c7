//! Driving port exposing the signed-in account to feature services.
//!
//! Phone, booking and avatar services depend on this port instead of the
//! synchroniser type so they stay testable with a double.

use async_trait::async_trait;

use crate::domain::{Error, ProfileUpdate, UserId};

/// Current account and profile mutation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountSession: Send + Sync {
    /// Signed-in user id, if any.
    fn current_user_id(&self) -> Option<UserId>;

    /// Apply a partial profile update and refresh the cached profile.
    async fn update_profile(&self, update: ProfileUpdate) -> Result<(), Error>;
}

/// Current user id, or a [`crate::domain::ErrorCode::NotAuthenticated`] error.
pub fn require_user_id<S>(session: &S) -> Result<UserId, Error>
where
    S: AccountSession + ?Sized,
{
    session.current_user_id().ok_or_else(Error::not_authenticated)
}
