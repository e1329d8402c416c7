//! Booking management for the signed-in user.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{
    AccountSession, BookingRepository, BookingRepositoryError, require_user_id,
};
use crate::domain::{Booking, BookingDraft, Error, UserId};

fn map_repository_error(error: BookingRepositoryError) -> Error {
    match error {
        BookingRepositoryError::Connection { message } => {
            Error::network(format!("booking repository unavailable: {message}"))
        }
        BookingRepositoryError::Query { message } => {
            Error::internal(format!("booking repository error: {message}"))
        }
        BookingRepositoryError::NotFound { message } => Error::not_found(message),
    }
}

fn missing(id: Uuid) -> Error {
    Error::not_found(format!("booking {id} not found"))
}

/// Booking CRUD scoped to the current account.
#[derive(Clone)]
pub struct BookingService<R, S> {
    bookings: Arc<R>,
    session: Arc<S>,
}

impl<R, S> BookingService<R, S> {
    /// Create a booking service over the repository and account session.
    pub fn new(bookings: Arc<R>, session: Arc<S>) -> Self {
        Self { bookings, session }
    }
}

impl<R, S> BookingService<R, S>
where
    R: BookingRepository,
    S: AccountSession,
{
    /// The user's bookings, latest departure first.
    pub async fn list(&self) -> Result<Vec<Booking>, Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        let mut bookings = self
            .bookings
            .list_for_user(&user_id)
            .await
            .map_err(map_repository_error)?;
        bookings.sort_by_key(|b| Reverse((b.draft.departure_date, b.draft.departure_time)));
        Ok(bookings)
    }

    /// One of the user's bookings.
    ///
    /// Bookings owned by someone else are reported as missing.
    pub async fn get(&self, id: Uuid) -> Result<Booking, Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        self.owned(&user_id, id).await
    }

    /// Validate and store a new booking.
    pub async fn create(&self, draft: BookingDraft) -> Result<Booking, Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        draft
            .validate()
            .map_err(|err| Error::validation(err.to_string()))?;
        let booking = self
            .bookings
            .insert(&user_id, &draft)
            .await
            .map_err(map_repository_error)?;
        info!(user_id = %user_id, booking_id = %booking.id, "booking created");
        Ok(booking)
    }

    /// Overwrite a booking's editable fields and return the stored row.
    pub async fn update(&self, id: Uuid, draft: BookingDraft) -> Result<Booking, Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        draft
            .validate()
            .map_err(|err| Error::validation(err.to_string()))?;
        self.owned(&user_id, id).await?;

        self.bookings
            .update(&id, &draft)
            .await
            .map_err(map_repository_error)?;
        info!(user_id = %user_id, booking_id = %id, "booking updated");
        self.owned(&user_id, id).await
    }

    /// Delete one of the user's bookings.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        self.owned(&user_id, id).await?;
        self.bookings
            .delete(&id)
            .await
            .map_err(map_repository_error)?;
        info!(user_id = %user_id, booking_id = %id, "booking deleted");
        Ok(())
    }

    async fn owned(&self, user_id: &UserId, id: Uuid) -> Result<Booking, Error> {
        self.bookings
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .filter(|booking| &booking.user_id == user_id)
            .ok_or_else(|| missing(id))
    }
}

#[cfg(test)]
#[path = "booking_service_tests.rs"]
mod tests;
