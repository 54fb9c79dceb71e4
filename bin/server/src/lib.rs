//! passage server library.
//!
//! Exposes the router and its state so the binary and the integration tests
//! assemble the application the same way.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
