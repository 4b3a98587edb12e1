//! Frame resource ring.
//!
//! This module provides the [`FrameManager`] struct, which owns a fixed ring
//! of [`FrameResource`]s and decides when each one may be reused.
//!
//! # Overview
//!
//! The frame manager implements a "frames in flight" pattern where multiple
//! frames can be processed concurrently:
//!
//! 1. While the GPU executes frame K, the CPU prepares frame K+1
//! 2. Each frame has its own copy of every constant region
//! 3. Each slot is stamped with the fence value of its last submission, and
//!    acquiring it again waits until the GPU has passed that value
//!
//! With N slots the CPU runs at most N-1 frames ahead of the GPU; N = 1 makes
//! every frame fully synchronous.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use frameflight_renderer::fence::FenceSynchronizer;
//! use frameflight_renderer::frame_manager::FrameManager;
//! use frameflight_renderer::frame_resource::FrameResourceDesc;
//! use frameflight_rhi::queue::SimulatedQueue;
//! use frameflight_rhi::sync::TimelineFence;
//!
//! # fn example() -> Result<(), frameflight_rhi::RhiError> {
//! let queue = SimulatedQueue::new(std::time::Duration::ZERO);
//! let mut sync = FenceSynchronizer::new(Arc::new(TimelineFence::new()), None)?;
//! let mut frames = FrameManager::new(3, &FrameResourceDesc::default())?;
//!
//! for _ in 0..6 {
//!     let frame = frames.acquire_current(&sync)?;
//!     // Write constants and record commands into `frame`...
//!     # let _ = frame;
//!     let value = sync.advance(&queue)?;
//!     frames.stamp_current(value)?;
//! }
//!
//! frames.wait_for_all_frames(&sync)?;
//! # Ok(())
//! # }
//! ```

use tracing::{debug, error, info, warn};

use frameflight_rhi::sync::FenceValue;
use frameflight_rhi::{RhiError, RhiResult};

use crate::fence::FenceSynchronizer;
use crate::frame_resource::{FrameResource, FrameResourceDesc};

/// Owns the ring of per-frame resources.
///
/// # Thread Safety
///
/// The frame manager is not thread-safe. It should only be accessed from the
/// thread running the frame loop.
#[derive(Debug)]
pub struct FrameManager {
    /// Per-frame resources.
    frames: Vec<FrameResource>,
    /// Slot handed out by the last acquire; `None` before the first one.
    current: Option<usize>,
    /// Highest value ever stamped onto a slot.
    last_stamp: FenceValue,
}

impl FrameManager {
    /// Allocates `frames_in_flight` frame resources.
    ///
    /// # Arguments
    ///
    /// * `frames_in_flight` - Ring size N, at least 1
    /// * `desc` - Region capacities shared by every slot
    ///
    /// # Errors
    ///
    /// Returns an error if `frames_in_flight` is zero or a region cannot be
    /// allocated.
    pub fn new(frames_in_flight: usize, desc: &FrameResourceDesc) -> RhiResult<Self> {
        if frames_in_flight == 0 {
            return Err(RhiError::InvalidState(
                "frame ring needs at least one slot".to_string(),
            ));
        }

        let frames = (0..frames_in_flight)
            .map(|i| FrameResource::new(i, desc))
            .collect::<RhiResult<Vec<_>>>()?;

        info!(
            "Frame manager created with {} frames in flight",
            frames_in_flight
        );

        Ok(Self {
            frames,
            current: None,
            last_stamp: FenceValue::ZERO,
        })
    }

    /// Advances to the next slot and returns it once the GPU is done with it.
    ///
    /// The first call returns slot 0; after that the index advances
    /// `(i + 1) mod N`. If the slot's stamp has not completed yet, this blocks
    /// in [`FenceSynchronizer::wait_until`].
    ///
    /// # Errors
    ///
    /// Propagates fence failures (device lost, timeout). The ring still
    /// counts the slot as current.
    pub fn acquire_current(&mut self, sync: &FenceSynchronizer) -> RhiResult<&mut FrameResource> {
        let next = match self.current {
            None => 0,
            Some(i) => (i + 1) % self.frames.len(),
        };
        self.current = Some(next);

        let stamp = self.frames[next].fence();
        if !stamp.is_zero() {
            let completed = sync.completed()?;
            if completed < stamp {
                warn!(
                    "Frame slot {} still in flight (fence {}, completed {}), waiting",
                    next, stamp, completed
                );
                sync.wait_until(stamp)?;
            }
        }

        debug!("Acquired frame slot {}", next);
        Ok(&mut self.frames[next])
    }

    /// Stamps the current slot with the fence value of its submission.
    ///
    /// Stamps must increase from one call to the next. A regression is a bug
    /// in the caller: it trips a debug assertion, and in release builds it is
    /// logged and the slot keeps the highest stamp seen so far so it is never
    /// reused early.
    ///
    /// # Errors
    ///
    /// Returns an error if no slot has been acquired yet.
    pub fn stamp_current(&mut self, value: FenceValue) -> RhiResult<()> {
        let index = self.current.ok_or_else(|| {
            RhiError::InvalidState("stamp_current called before acquire_current".to_string())
        })?;

        let stamp = if value <= self.last_stamp {
            debug_assert!(
                value > self.last_stamp,
                "fence stamp regressed: {} after {}",
                value,
                self.last_stamp
            );
            error!(
                "Fence stamp regressed on slot {}: {} after {}",
                index, value, self.last_stamp
            );
            self.last_stamp
        } else {
            value
        };

        self.frames[index].set_fence(stamp);
        self.last_stamp = stamp;
        debug!("Stamped frame slot {} with fence {}", index, stamp);
        Ok(())
    }

    /// Waits for all in-flight frames to complete.
    ///
    /// Call before releasing anything the GPU may still read.
    ///
    /// # Errors
    ///
    /// Returns an error if any wait fails.
    pub fn wait_for_all_frames(&self, sync: &FenceSynchronizer) -> RhiResult<()> {
        for frame in self.frames.iter().filter(|f| !f.fence().is_zero()) {
            sync.wait_until(frame.fence())?;
        }
        debug!("All {} frame slots retired", self.frames.len());
        Ok(())
    }

    /// Index of the slot handed out by the last acquire.
    #[inline]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The slot handed out by the last acquire.
    pub fn current(&self) -> Option<&FrameResource> {
        self.current.map(|i| &self.frames[i])
    }

    /// The slot handed out by the last acquire, for writing.
    pub fn current_mut(&mut self) -> Option<&mut FrameResource> {
        self.current.map(|i| &mut self.frames[i])
    }

    /// Returns slot `index`.
    pub fn frame(&self, index: usize) -> Option<&FrameResource> {
        self.frames.get(index)
    }

    /// All slots in ring order.
    pub fn frames(&self) -> &[FrameResource] {
        &self.frames
    }

    /// Highest stamp applied so far.
    #[inline]
    pub fn last_stamp(&self) -> FenceValue {
        self.last_stamp
    }

    /// Returns the number of frames in flight.
    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }
}
