//! Phone numbers attached to the signed-in user's profile.
//!
//! A user holds at most one number per [`PhoneType`]. The Primary number is
//! mirrored onto the profile row so screens that only read the profile still
//! show it.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::ports::{AccountSession, PhoneRepository, PhoneRepositoryError, require_user_id};
use crate::domain::phone::sort_for_display;
use crate::domain::{Error, NewPhoneNumber, PhoneNumber, PhoneType, ProfileUpdate};

fn map_repository_error(error: PhoneRepositoryError) -> Error {
    match error {
        PhoneRepositoryError::Connection { message } => {
            Error::network(format!("phone repository unavailable: {message}"))
        }
        PhoneRepositoryError::Query { message } => {
            Error::internal(format!("phone repository error: {message}"))
        }
        PhoneRepositoryError::Duplicate { message } => Error::conflict(message),
    }
}

fn duplicate_type(phone_type: PhoneType) -> Error {
    Error::conflict(format!("A {phone_type} phone number already exists"))
}

/// Phone number management for the current account.
#[derive(Clone)]
pub struct PhoneBook<R, S> {
    phones: Arc<R>,
    session: Arc<S>,
}

impl<R, S> PhoneBook<R, S> {
    /// Create a phone book over the phone repository and account session.
    pub fn new(phones: Arc<R>, session: Arc<S>) -> Self {
        Self { phones, session }
    }
}

impl<R, S> PhoneBook<R, S>
where
    R: PhoneRepository,
    S: AccountSession,
{
    /// Numbers for the current user in display order.
    pub async fn list(&self) -> Result<Vec<PhoneNumber>, Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        let mut phones = self
            .phones
            .list_for_user(&user_id)
            .await
            .map_err(map_repository_error)?;
        sort_for_display(&mut phones);
        Ok(phones)
    }

    /// Add a number of a type the user does not have yet.
    ///
    /// Adding a Primary number also copies it onto the profile.
    pub async fn add(
        &self,
        country_code: Option<&str>,
        phone_number: &str,
        phone_type: PhoneType,
    ) -> Result<PhoneNumber, Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        let phone = NewPhoneNumber::new(country_code, phone_number, phone_type)
            .map_err(|err| Error::validation(err.to_string()))?;

        let existing = self
            .phones
            .list_for_user(&user_id)
            .await
            .map_err(map_repository_error)?;
        if existing.iter().any(|row| row.phone_type == phone_type) {
            return Err(duplicate_type(phone_type));
        }

        let stored = self
            .phones
            .insert(&user_id, &phone)
            .await
            .map_err(|err| match err {
                PhoneRepositoryError::Duplicate { .. } => duplicate_type(phone_type),
                other => map_repository_error(other),
            })?;
        info!(user_id = %user_id, phone_type = %phone_type, "phone number added");

        if phone_type == PhoneType::Primary {
            let update = ProfileUpdate::default().phone(
                stored.country_code.clone(),
                stored.phone_number.clone(),
            );
            self.session.update_profile(update).await?;
            debug!(user_id = %user_id, "primary number copied to profile");
        }
        Ok(stored)
    }

    /// Remove one of the user's numbers.
    ///
    /// Removing the Primary number clears the profile's phone fields.
    pub async fn remove(&self, phone_id: Uuid) -> Result<(), Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        let existing = self
            .phones
            .list_for_user(&user_id)
            .await
            .map_err(map_repository_error)?;
        let Some(target) = existing.into_iter().find(|row| row.id == phone_id) else {
            return Err(Error::not_found(format!("phone number {phone_id} not found")));
        };

        self.phones
            .delete(&phone_id)
            .await
            .map_err(map_repository_error)?;
        info!(user_id = %user_id, phone_type = %target.phone_type, "phone number removed");

        if target.phone_type == PhoneType::Primary {
            self.session
                .update_profile(ProfileUpdate::default().clear_phone())
                .await?;
        }
        Ok(())
    }

    /// Phone types the user can still add, in display order.
    pub async fn available_types(&self) -> Result<Vec<PhoneType>, Error> {
        let taken: Vec<PhoneType> = self
            .list()
            .await?
            .into_iter()
            .map(|row| row.phone_type)
            .collect();
        Ok(PhoneType::ALL
            .into_iter()
            .filter(|kind| !taken.contains(kind))
            .collect())
    }
}

#[cfg(test)]
#[path = "phone_book_tests.rs"]
mod tests;
