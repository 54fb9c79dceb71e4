//! Error handling foundation for passage.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain error enum and returns it wrapped in
//! a `Report`, so callers can still make typed decisions through
//! `Report::current_context()`.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
