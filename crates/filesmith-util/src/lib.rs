//! Shared utilities for filesmith.
//!
//! This crate provides common utilities used across the filesmith workspace:
//! - Content hashing
//! - Logging setup with tracing
//! - Path resolution against a project root

pub mod hash;
pub mod log;
pub mod path;

pub use hash::content_hash;
pub use path::{normalize, PathResolver};
