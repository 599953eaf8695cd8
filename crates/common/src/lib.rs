//! Common utilities shared across the events platform crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, leeway bounds, kid extraction)
pub mod jwt;
