//! Graphics API seam (Render Hardware Interface).
//!
//! This crate provides the capabilities the frame pipeline consumes from the
//! graphics API:
//! - Completion fences (software timeline and Vulkan timeline semaphore)
//! - Command buffer recording
//! - Command queues, including a simulated GPU queue
//! - Host-visible upload buffers
//! - Vertex formats

mod error;

pub mod buffer;
pub mod command;
pub mod queue;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
