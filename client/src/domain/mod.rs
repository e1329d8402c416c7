//! Domain primitives, ports and services.
//!
//! Purpose: define the strongly typed records the booking client works with,
//! the ports its backend adapters implement, and the services that keep the
//! signed-in user's session, profile, phones and bookings consistent.
//!
//! Public surface:
//! - Error / ErrorCode: error payload surfaced to callers.
//! - UserId, Email, DisplayName: validated identity primitives.
//! - Credentials, Session, AuthChange: auth values exchanged with the backend.
//! - AuthState: tagged state published by [`SessionSynchronizer`].
//! - UserProfile, ProfileUpdate, PhoneNumber, Booking: stored records.
//! - SessionSynchronizer, PhoneBook, BookingService, AvatarService: services.

pub mod auth;
pub mod auth_state;
pub mod avatar_service;
pub mod booking;
pub mod booking_service;
pub mod error;
mod formats;
pub mod phone;
pub mod phone_book;
pub mod ports;
pub mod profile;
pub mod session_synchronizer;
pub mod user;

pub use self::auth::{
    AuthChange, AuthEvent, AuthResponse, Credentials, CredentialsValidationError, PASSWORD_MIN,
    Session,
};
pub use self::auth_state::AuthState;
pub use self::avatar_service::{AvatarService, DEFAULT_PROFILE_IMAGE_BUCKET, IMAGE_EXTENSIONS};
pub use self::booking::{
    Booking, BookingDraft, BookingStatus, BookingValidationError, OilStatus, PaymentStatus,
    ReturnType,
};
pub use self::booking_service::BookingService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::phone::{NewPhoneNumber, PhoneNumber, PhoneType, PhoneValidationError};
pub use self::phone_book::PhoneBook;
pub use self::profile::{NewProfile, ProfileUpdate, UserProfile};
pub use self::session_synchronizer::{RemoteSignOut, SessionSynchronizer};
pub use self::user::{DisplayName, Email, NAME_MAX, UserId, UserValidationError};

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, Error>;
