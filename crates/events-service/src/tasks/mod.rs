//! Background tasks for the events service.
//!
//! # Tasks
//!
//! - `jwks_refresh` - Periodically refreshes the signing key set

pub mod jwks_refresh;

pub use jwks_refresh::start_jwks_refresh;
