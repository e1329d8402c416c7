//! Port abstraction for the `users` profile table.
use async_trait::async_trait;

use crate::domain::{NewProfile, ProfileUpdate, UserId, UserProfile};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by profile repository adapters.
    pub enum ProfileRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "profile repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "profile repository query failed: {message}",
        /// No row matched the id.
        NotFound { message: String } => "profile not found: {message}",
    }
}

/// Row-level access to profiles keyed by identity id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert the row, or overwrite the sign-up fields if it already exists.
    async fn upsert(&self, profile: &NewProfile) -> Result<(), ProfileRepositoryError>;

    /// Fetch a profile by identity id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileRepositoryError>;

    /// Write the touched fields of `update` to the row.
    async fn update(&self, id: &UserId, update: &ProfileUpdate) -> Result<(), ProfileRepositoryError>;
}
