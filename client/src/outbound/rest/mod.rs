//! REST outbound adapter for the hosted backend.
//!
//! A single [`RestBackend`] implements the auth, row and storage ports with
//! `reqwest`, mirroring the backend's auth, PostgREST and storage endpoints.

mod auth;
mod backend;
mod dto;
mod storage;
mod tables;

pub use backend::RestBackend;
