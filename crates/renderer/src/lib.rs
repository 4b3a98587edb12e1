//! Frame pipelining for CPU/GPU overlap.
//!
//! This crate lets the CPU prepare future frames while the GPU still
//! executes earlier ones:
//! - Fence synchronization (issue, poll and wait on completion values)
//! - A ring of per-frame resources reused only after the GPU retires them
//! - Dirty propagation of object and material constants across the ring
//! - The frame orchestrator tying these together

pub mod animation;
pub mod context;
pub mod dirty;
pub mod fence;
pub mod frame_manager;
pub mod frame_resource;
pub mod renderer;

pub use animation::{MaterialScroll, WaveAnimator};
pub use context::{FrameUpdate, RenderContext, SceneAnimator, SceneUpdate};
pub use dirty::{DirtyEntity, DirtyTracker, UpdateStats};
pub use fence::FenceSynchronizer;
pub use frame_manager::FrameManager;
pub use frame_resource::{FrameRegions, FrameResource, FrameResourceDesc};
pub use renderer::{FrameState, FrameStats, Renderer, RendererSettings};

/// Default number of frame resources in the ring.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;
