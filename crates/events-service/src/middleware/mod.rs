//! Middleware for the events service.
//!
//! # Components
//!
//! - `auth` - Permission gate for protected routes

pub mod auth;

pub use auth::{require_permission, AuthGate};
