//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`AuthBackend`, the repositories and `BlobStore`) describe the
//! hosted backend; `AccountSession` is the driving port feature services use
//! to reach the signed-in account.

mod macros;
pub(crate) use macros::define_port_error;

mod account_session;
mod auth_backend;
mod blob_store;
mod booking_repository;
mod phone_repository;
mod profile_repository;

#[cfg(test)]
pub use account_session::MockAccountSession;
pub use account_session::{AccountSession, require_user_id};
#[cfg(test)]
pub use auth_backend::MockAuthBackend;
pub use auth_backend::{AuthBackend, AuthBackendError, AuthChangeHub, AuthSubscription};
#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{BlobStore, BlobStoreError, BlobUpload};
#[cfg(test)]
pub use booking_repository::MockBookingRepository;
pub use booking_repository::{BookingRepository, BookingRepositoryError};
#[cfg(test)]
pub use phone_repository::MockPhoneRepository;
pub use phone_repository::{PhoneRepository, PhoneRepositoryError};
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::{ProfileRepository, ProfileRepositoryError};
