//! # tokwav Common Library
//!
//! Shared code for the tokwav services:
//! - Error types
//! - Bootstrap configuration loading and root folder resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
