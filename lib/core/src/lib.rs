//! Core types shared across the passage workspace.
//!
//! This crate provides the identifier types and the error-handling
//! foundation used by the authentication library and the server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, UserId};
