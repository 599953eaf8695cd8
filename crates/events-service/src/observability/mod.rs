//! Observability for the events service.
//!
//! Provides metric definitions and the Prometheus recorder setup.

pub mod metrics;
