//! Events Service Library
//!
//! Core functionality for the events API backend: authenticating requests
//! against the identity provider's published signing keys and enforcing
//! per-operation permissions before any handler runs.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs (AuthGate) -> handlers/*.rs
//!                        |
//!                        v
//!   auth::header -> auth::jwt (TokenVerifier) -> auth::permissions
//!                        |
//!                        v
//!                  auth::jwks (KeySetCache)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, verification, key set cache, permissions
//! - `config` - Service configuration from environment
//! - `errors` - HTTP error type and JSON rendering
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission gate middleware
//! - `models` - Response models
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `tasks` - Background key set refresh

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod tasks;
