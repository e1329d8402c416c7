//! Client-side core of the booking app.
//!
//! The crate keeps a reactive mirror of the signed-in session and profile,
//! and offers profile, phone number, booking and avatar services on top of a
//! hosted backend reached through the ports in [`domain::ports`].

pub mod config;
pub mod domain;
pub mod outbound;

pub use config::ClientSettings;
