//! RHI-specific error types.

use thiserror::Error;

use crate::sync::FenceValue;

/// RHI-specific error type.
///
/// Every variant except [`RhiError::InvalidState`] is fatal to the frame loop:
/// there is no defined way to resume after losing the GPU or after a
/// constant region was sized too small.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// The device was removed or reset while work was outstanding.
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// A fence wait expired before the target value was reached.
    #[error("Timed out waiting for fence value {target} (completed {completed})")]
    WaitTimeout {
        /// Value the caller waited for.
        target: FenceValue,
        /// Last value observed complete.
        completed: FenceValue,
    },

    /// An element index does not fit the provisioned buffer region.
    #[error("Index {index} exceeds capacity {capacity} of buffer region '{region}'")]
    CapacityExceeded {
        /// Label of the region.
        region: String,
        /// Offending element index.
        index: usize,
        /// Number of elements the region was created with.
        capacity: usize,
    },

    /// The queue's execution thread is gone.
    #[error("Command queue is closed")]
    QueueClosed,

    /// An object was used in the wrong state (e.g. submitting an open command buffer).
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
