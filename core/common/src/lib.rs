//! Common utilities and types shared across PpkVault crates.
//!
//! This module provides the error taxonomy used by every layer and a few
//! small helpers for identifiers and timestamps.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{now_millis, KeyId};
