//! Shared utilities for daybook.
//!
//! This crate provides common utilities used across the daybook workspace:
//! - Error handling patterns
//! - Logging setup with tracing
//! - Path utilities
//! - Human-readable formatting of sizes and timestamps

pub mod error;
pub mod format;
pub mod log;
pub mod path;

pub use error::{Error, ErrorKind, Result};
pub use format::{format_size, format_time};
