//! Outbound adapters implementing domain ports for the hosted backend.
//!
//! - **rest**: `reqwest`-backed auth, rows and object storage
//! - **memory**: in-process double for tests (`test-support` feature)
//!
//! Adapters are thin translators between domain types and the backend's wire
//! representations. They contain no business logic.

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod rest;
