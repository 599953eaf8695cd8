//! # Events Test Utilities
//!
//! Shared test utilities for the events service.
//!
//! This crate provides:
//! - Fixed RSA signing keys (`test-key-a`, `test-key-b`) and their JWKs
//! - A claims builder (TestClaimsBuilder)
//! - Server test harness (TestEventsServer) with a mocked JWKS endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use events_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let server = TestEventsServer::spawn(&[TestSigningKey::a()]).await?;
//!     let token = TestSigningKey::a().sign(
//!         &TestClaimsBuilder::new().with_permissions(&["read:events"]).build(),
//!     )?;
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
