//! Port abstraction for the `bookings` table.
//!
//! The repository performs single request-response calls; it offers no
//! consistency guarantees beyond what the backend provides per call.
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Booking, BookingDraft, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by booking repository adapters.
    pub enum BookingRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "booking repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "booking repository query failed: {message}",
        /// No row matched the id.
        NotFound { message: String } => "booking not found: {message}",
    }
}

/// Row-level access to bookings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Bookings owned by `user_id`.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>, BookingRepositoryError>;

    /// Fetch one booking by id.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Booking>, BookingRepositoryError>;

    /// Insert a booking owned by `user_id` and return the stored row.
    async fn insert(
        &self,
        user_id: &UserId,
        draft: &BookingDraft,
    ) -> Result<Booking, BookingRepositoryError>;

    /// Overwrite the editable fields of a booking.
    async fn update(&self, id: &Uuid, draft: &BookingDraft) -> Result<(), BookingRepositoryError>;

    /// Delete a booking.
    async fn delete(&self, id: &Uuid) -> Result<(), BookingRepositoryError>;
}
