//! CPU-side view of the GPU completion timeline.
//!
//! [`FenceSynchronizer`] hands out one fence value per submission and lets
//! the frame loop block until the GPU has caught up to a given value.
//!
//! # Overview
//!
//! ```text
//! CPU:  submit f1 ─ advance()=1 ─ submit f2 ─ advance()=2 ─ wait_until(1) ─ ...
//! GPU:        [ execute f1 ] signal 1   [ execute f2 ] signal 2
//! ```
//!
//! Values are issued strictly increasing with no gaps, and the queue applies
//! signals in submission order, so `completed() >= v` means every submission
//! up to the one stamped `v` has retired.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use frameflight_rhi::queue::CommandQueue;
use frameflight_rhi::sync::{Fence, FenceValue};
use frameflight_rhi::{RhiError, RhiResult};

/// Issues fence values and waits on them.
pub struct FenceSynchronizer {
    fence: Arc<dyn Fence>,
    last_issued: FenceValue,
    timeout: Option<Duration>,
}

impl FenceSynchronizer {
    /// Wraps `fence`, continuing its timeline from the current completed
    /// value.
    ///
    /// # Arguments
    ///
    /// * `fence` - The shared completion fence the queue signals
    /// * `timeout` - Upper bound on a single [`wait_until`](Self::wait_until);
    ///   `None` waits forever
    ///
    /// # Errors
    ///
    /// Returns an error if the fence cannot be queried.
    pub fn new(fence: Arc<dyn Fence>, timeout: Option<Duration>) -> RhiResult<Self> {
        let last_issued = fence.completed_value()?;
        debug!(
            "Fence synchronizer starting at {} (timeout {:?})",
            last_issued, timeout
        );
        Ok(Self {
            fence,
            last_issued,
            timeout,
        })
    }

    /// Allocates the next fence value and queues a signal of it behind
    /// everything already submitted to `queue`.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue rejects the signal. The value is not
    /// consumed in that case.
    pub fn advance(&mut self, queue: &dyn CommandQueue) -> RhiResult<FenceValue> {
        let value = self.last_issued.next();
        queue.signal(&self.fence, value)?;
        self.last_issued = value;
        Ok(value)
    }

    /// Highest value the GPU has confirmed. Never blocks.
    pub fn completed(&self) -> RhiResult<FenceValue> {
        self.fence.completed_value()
    }

    /// Blocks until `completed() >= target`.
    ///
    /// Returns immediately if the target has already been reached.
    ///
    /// # Errors
    ///
    /// [`RhiError::DeviceLost`] and [`RhiError::WaitTimeout`] are fatal: the
    /// GPU will never reach `target`.
    pub fn wait_until(&self, target: FenceValue) -> RhiResult<()> {
        if self.fence.completed_value()? >= target {
            return Ok(());
        }

        if target > self.last_issued {
            warn!(
                "Waiting for fence value {} that was never issued (last issued {})",
                target, self.last_issued
            );
        }

        let start = Instant::now();
        match self.fence.wait_for_value(target, self.timeout) {
            Ok(()) => {
                debug!("Waited {:?} for fence value {}", start.elapsed(), target);
                Ok(())
            }
            Err(e @ (RhiError::DeviceLost(_) | RhiError::WaitTimeout { .. })) => {
                error!("Fence wait for value {} failed: {}", target, e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Blocks until every issued value has completed.
    pub fn wait_idle(&self) -> RhiResult<()> {
        self.wait_until(self.last_issued)
    }

    /// The most recently issued value.
    #[inline]
    pub fn last_issued(&self) -> FenceValue {
        self.last_issued
    }

    /// The configured wait timeout.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The underlying fence.
    #[inline]
    pub fn fence(&self) -> &Arc<dyn Fence> {
        &self.fence
    }
}

impl std::fmt::Debug for FenceSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FenceSynchronizer")
            .field("last_issued", &self.last_issued)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use super::*;
    use frameflight_rhi::command::CommandBuffer;
    use frameflight_rhi::sync::TimelineFence;

    /// Queue that applies signals immediately.
    #[derive(Default)]
    struct ImmediateQueue {
        signals: Mutex<Vec<FenceValue>>,
    }

    impl CommandQueue for ImmediateQueue {
        fn submit(&self, _buffer: &CommandBuffer) -> RhiResult<()> {
            Ok(())
        }

        fn signal(&self, fence: &Arc<dyn Fence>, value: FenceValue) -> RhiResult<()> {
            self.signals.lock().unwrap().push(value);
            fence.signal(value)
        }
    }

    /// Queue that records signals but never applies them.
    #[derive(Default)]
    struct StalledQueue;

    impl CommandQueue for StalledQueue {
        fn submit(&self, _buffer: &CommandBuffer) -> RhiResult<()> {
            Ok(())
        }

        fn signal(&self, _fence: &Arc<dyn Fence>, _value: FenceValue) -> RhiResult<()> {
            Ok(())
        }
    }

    struct ClosedQueue;

    impl CommandQueue for ClosedQueue {
        fn submit(&self, _buffer: &CommandBuffer) -> RhiResult<()> {
            Err(RhiError::QueueClosed)
        }

        fn signal(&self, _fence: &Arc<dyn Fence>, _value: FenceValue) -> RhiResult<()> {
            Err(RhiError::QueueClosed)
        }
    }

    #[test]
    fn test_advance_is_gapless() {
        let queue = ImmediateQueue::default();
        let mut sync = FenceSynchronizer::new(Arc::new(TimelineFence::new()), None).unwrap();

        let issued: Vec<u64> = (0..5).map(|_| sync.advance(&queue).unwrap().get()).collect();
        assert_eq!(issued, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            *queue.signals.lock().unwrap(),
            (1..=5).map(FenceValue::new).collect::<Vec<_>>()
        );
        assert_eq!(sync.completed().unwrap(), FenceValue::new(5));
    }

    #[test]
    fn test_timeline_continues_from_completed_value() {
        let fence = Arc::new(TimelineFence::new());
        fence.signal(FenceValue::new(41)).unwrap();
        let mut sync = FenceSynchronizer::new(fence, None).unwrap();
        assert_eq!(sync.advance(&StalledQueue).unwrap(), FenceValue::new(42));
    }

    #[test]
    fn test_failed_advance_does_not_consume_value() {
        let mut sync = FenceSynchronizer::new(Arc::new(TimelineFence::new()), None).unwrap();
        assert!(matches!(
            sync.advance(&ClosedQueue),
            Err(RhiError::QueueClosed)
        ));
        assert_eq!(sync.last_issued(), FenceValue::ZERO);
        assert_eq!(sync.advance(&StalledQueue).unwrap(), FenceValue::new(1));
    }

    #[test]
    fn test_wait_until_satisfied_is_noop() {
        let sync = FenceSynchronizer::new(Arc::new(TimelineFence::new()), Some(Duration::ZERO))
            .unwrap();
        sync.wait_until(FenceValue::ZERO).unwrap();
    }

    #[test]
    fn test_wait_until_blocks_for_signal() {
        let fence = Arc::new(TimelineFence::new());
        let mut sync = FenceSynchronizer::new(fence.clone(), None).unwrap();
        let target = sync.advance(&StalledQueue).unwrap();

        let signaler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            fence.signal(target).unwrap();
        });

        sync.wait_until(target).unwrap();
        assert!(sync.completed().unwrap() >= target);
        signaler.join().unwrap();
    }

    #[test]
    fn test_wait_until_times_out() {
        let mut sync = FenceSynchronizer::new(
            Arc::new(TimelineFence::new()),
            Some(Duration::from_millis(10)),
        )
        .unwrap();
        let target = sync.advance(&StalledQueue).unwrap();
        assert!(matches!(
            sync.wait_until(target),
            Err(RhiError::WaitTimeout { .. })
        ));
    }

    #[test]
    fn test_device_lost_is_reported() {
        let fence = Arc::new(TimelineFence::new());
        let mut sync = FenceSynchronizer::new(fence.clone(), None).unwrap();
        let target = sync.advance(&StalledQueue).unwrap();
        fence.mark_device_lost("removed");
        assert!(matches!(
            sync.wait_until(target),
            Err(RhiError::DeviceLost(_))
        ));
    }

    #[test]
    fn test_fence_synchronizer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FenceSynchronizer>();
    }
}
