//! Core utilities for the frame pipeline.
//!
//! This crate provides foundational types and utilities used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Configuration management

mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, MAX_FRAMES_IN_FLIGHT};
pub use error::{Error, Result};
pub use logging::{DEFAULT_LOG_FILTER, init_logging};
pub use timer::{FrameTime, Timer};
