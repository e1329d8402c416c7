//! Port abstraction for the `user_phones` table.
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewPhoneNumber, PhoneNumber, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by phone repository adapters.
    pub enum PhoneRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "phone repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "phone repository query failed: {message}",
        /// A uniqueness constraint rejected the insert.
        Duplicate { message: String } => "phone number already exists: {message}",
    }
}

/// Row-level access to phone numbers keyed by id with foreign key `user_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhoneRepository: Send + Sync {
    /// All numbers belonging to `user_id`, in storage order.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PhoneNumber>, PhoneRepositoryError>;

    /// Insert a number for `user_id` and return the stored row.
    async fn insert(
        &self,
        user_id: &UserId,
        phone: &NewPhoneNumber,
    ) -> Result<PhoneNumber, PhoneRepositoryError>;

    /// Delete a number by row id. Deleting a missing row is not an error.
    async fn delete(&self, id: &Uuid) -> Result<(), PhoneRepositoryError>;
}
