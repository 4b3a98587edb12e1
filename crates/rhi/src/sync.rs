//! CPU/GPU synchronization primitives.
//!
//! This module provides the completion-fence abstraction the frame pipeline
//! is built on:
//! - [`FenceValue`] - a point on a monotonically increasing completion timeline
//! - [`Fence`] - the primitive itself (signal, poll, blocking wait)
//! - [`TimelineFence`] - software fence backed by a condition variable
//! - [`VkTimelineFence`] - Vulkan timeline semaphore
//!
//! # Overview
//!
//! A fence is a 64-bit counter owned by the GPU timeline. The CPU picks a new
//! value for every submission and asks the queue to signal it once the GPU
//! has drained everything submitted before. Polling the counter tells the CPU
//! how far the GPU has progressed; waiting on it blocks the CPU thread until
//! the GPU catches up.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use frameflight_rhi::sync::{Fence, FenceValue, TimelineFence};
//!
//! # fn example() -> Result<(), frameflight_rhi::RhiError> {
//! let fence = TimelineFence::new();
//! assert_eq!(fence.completed_value()?, FenceValue::ZERO);
//!
//! fence.signal(FenceValue::new(1))?;
//! fence.wait_for_value(FenceValue::new(1), Some(Duration::from_millis(10)))?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ash::vk;
use tracing::{debug, error, warn};

use crate::error::{RhiError, RhiResult};

/// A point on a fence's completion timeline.
///
/// `FenceValue::ZERO` is the initial value of every fence and marks a frame
/// resource that was never submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(u64);

impl FenceValue {
    /// The initial value of every fence.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw counter value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true for [`FenceValue::ZERO`].
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns the value that follows `self`.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for FenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// GPU completion fence.
///
/// Implementations must keep [`completed_value`](Self::completed_value)
/// monotonic: once a value has been observed complete it is never reported
/// incomplete again.
pub trait Fence: Send + Sync {
    /// Returns the highest value known to be complete. Never blocks.
    fn completed_value(&self) -> RhiResult<FenceValue>;

    /// Sets the completed value from the CPU side.
    ///
    /// Queues call this when their work up to the signal point retires.
    fn signal(&self, value: FenceValue) -> RhiResult<()>;

    /// Blocks until the completed value reaches `value`.
    ///
    /// Returns immediately if it already has. `timeout` of `None` waits
    /// forever.
    ///
    /// # Errors
    ///
    /// - [`RhiError::WaitTimeout`] if `timeout` elapses first
    /// - [`RhiError::DeviceLost`] if the device goes away while waiting
    fn wait_for_value(&self, value: FenceValue, timeout: Option<Duration>) -> RhiResult<()>;
}

#[derive(Debug, Default)]
struct TimelineState {
    completed: FenceValue,
    lost: Option<String>,
}

/// Software completion fence.
///
/// The counter lives behind a mutex and waiters sleep on a condition variable,
/// so a blocked CPU thread costs nothing until the fence is signaled. Used by
/// the simulated queue and by tests that drive the timeline by hand.
///
/// # Thread Safety
///
/// All methods take `&self` and may be called from any thread; the fence is
/// typically shared as `Arc<TimelineFence>` between the frame loop and the
/// queue's execution thread.
#[derive(Debug, Default)]
pub struct TimelineFence {
    state: Mutex<TimelineState>,
    signaled: Condvar,
}

impl TimelineFence {
    /// Creates a fence at [`FenceValue::ZERO`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts the fence into the device-lost state.
    ///
    /// Every current and future wait that is not already satisfied fails with
    /// [`RhiError::DeviceLost`].
    pub fn mark_device_lost(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!("Fence marked device lost: {}", reason);
        self.lock().lost = Some(reason);
        self.signaled.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, TimelineState> {
        // The state is two plain values; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Fence for TimelineFence {
    fn completed_value(&self) -> RhiResult<FenceValue> {
        Ok(self.lock().completed)
    }

    fn signal(&self, value: FenceValue) -> RhiResult<()> {
        let mut state = self.lock();
        if value < state.completed {
            warn!(
                "Ignoring fence signal {} below completed value {}",
                value, state.completed
            );
            return Ok(());
        }
        state.completed = value;
        drop(state);
        self.signaled.notify_all();
        Ok(())
    }

    fn wait_for_value(&self, value: FenceValue, timeout: Option<Duration>) -> RhiResult<()> {
        let state = self.lock();
        if state.completed >= value {
            return Ok(());
        }

        let pending = |s: &mut TimelineState| s.completed < value && s.lost.is_none();
        let state = match timeout {
            None => self
                .signaled
                .wait_while(state, pending)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.signaled
                    .wait_timeout_while(state, timeout, pending)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };

        if state.completed >= value {
            Ok(())
        } else if let Some(reason) = &state.lost {
            Err(RhiError::DeviceLost(reason.clone()))
        } else {
            Err(RhiError::WaitTimeout {
                target: value,
                completed: state.completed,
            })
        }
    }
}

/// Vulkan timeline semaphore used as a completion fence.
///
/// Requires Vulkan 1.2 (or `VK_KHR_timeline_semaphore`) with the
/// `timelineSemaphore` feature enabled on the device. Queue submissions signal
/// it through `vk::TimelineSemaphoreSubmitInfo`; the CPU side uses
/// `vkGetSemaphoreCounterValue`, `vkSignalSemaphore` and `vkWaitSemaphores`.
///
/// # Thread Safety
///
/// Timeline semaphore host operations are externally synchronized only with
/// respect to destruction, so the wrapper is `Send + Sync`.
pub struct VkTimelineFence {
    /// Logical device the semaphore belongs to.
    device: ash::Device,
    /// Vulkan semaphore handle.
    semaphore: vk::Semaphore,
}

impl VkTimelineFence {
    /// Creates a timeline semaphore starting at `initial`.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: ash::Device, initial: FenceValue) -> RhiResult<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial.get());
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe { device.create_semaphore(&create_info, None)? };

        debug!("Created timeline semaphore (initial value {})", initial);

        Ok(Self { device, semaphore })
    }

    /// Returns the Vulkan semaphore handle.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

fn device_error(result: vk::Result) -> RhiError {
    match result {
        vk::Result::ERROR_DEVICE_LOST => RhiError::DeviceLost(result.to_string()),
        other => RhiError::VulkanError(other),
    }
}

impl Fence for VkTimelineFence {
    fn completed_value(&self) -> RhiResult<FenceValue> {
        let value = unsafe { self.device.get_semaphore_counter_value(self.semaphore) }
            .map_err(device_error)?;
        Ok(FenceValue::new(value))
    }

    fn signal(&self, value: FenceValue) -> RhiResult<()> {
        let signal_info = vk::SemaphoreSignalInfo::default()
            .semaphore(self.semaphore)
            .value(value.get());
        unsafe { self.device.signal_semaphore(&signal_info) }.map_err(device_error)
    }

    fn wait_for_value(&self, value: FenceValue, timeout: Option<Duration>) -> RhiResult<()> {
        let semaphores = [self.semaphore];
        let values = [value.get()];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        let timeout_ns = timeout
            .map(|t| u64::try_from(t.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(u64::MAX);

        match unsafe { self.device.wait_semaphores(&wait_info, timeout_ns) } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(RhiError::WaitTimeout {
                target: value,
                completed: self.completed_value()?,
            }),
            Err(e) => Err(device_error(e)),
        }
    }
}

impl Drop for VkTimelineFence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed timeline semaphore");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_fence_value_ordering() {
        assert!(FenceValue::ZERO.is_zero());
        assert_eq!(FenceValue::ZERO.next(), FenceValue::new(1));
        assert!(FenceValue::new(2) > FenceValue::new(1));
    }

    #[test]
    fn test_signal_is_monotonic() {
        let fence = TimelineFence::new();
        fence.signal(FenceValue::new(5)).unwrap();
        fence.signal(FenceValue::new(3)).unwrap();
        assert_eq!(fence.completed_value().unwrap(), FenceValue::new(5));
    }

    #[test]
    fn test_wait_satisfied_returns_immediately() {
        let fence = TimelineFence::new();
        fence.signal(FenceValue::new(2)).unwrap();
        fence
            .wait_for_value(FenceValue::new(1), Some(Duration::ZERO))
            .unwrap();
        fence.wait_for_value(FenceValue::ZERO, None).unwrap();
    }

    #[test]
    fn test_wait_times_out() {
        let fence = TimelineFence::new();
        let err = fence
            .wait_for_value(FenceValue::new(1), Some(Duration::from_millis(20)))
            .unwrap_err();
        match err {
            RhiError::WaitTimeout { target, completed } => {
                assert_eq!(target, FenceValue::new(1));
                assert_eq!(completed, FenceValue::ZERO);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wait_wakes_on_signal_from_other_thread() {
        let fence = Arc::new(TimelineFence::new());
        let signaler = {
            let fence = fence.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                fence.signal(FenceValue::new(1)).unwrap();
            })
        };

        let start = Instant::now();
        fence.wait_for_value(FenceValue::new(1), None).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(25));
        signaler.join().unwrap();
    }

    #[test]
    fn test_device_lost_fails_pending_waits() {
        let fence = Arc::new(TimelineFence::new());
        let loser = {
            let fence = fence.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                fence.mark_device_lost("test removal");
            })
        };

        let err = fence.wait_for_value(FenceValue::new(1), None).unwrap_err();
        assert!(matches!(err, RhiError::DeviceLost(_)));
        loser.join().unwrap();

        // Already-satisfied waits stay satisfied.
        fence.wait_for_value(FenceValue::ZERO, None).unwrap();
    }

    #[test]
    fn test_timeline_fence_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TimelineFence>();
    }

    #[test]
    fn test_vk_timeline_fence_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VkTimelineFence>();
    }
}
