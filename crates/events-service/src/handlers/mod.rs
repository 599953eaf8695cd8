//! HTTP request handlers for the events service.

pub mod health;
pub mod me;
pub mod metrics;
pub mod root;

pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
pub use root::{not_found, welcome};
