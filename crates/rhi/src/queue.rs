//! Command submission queues.
//!
//! This module provides the queue abstraction the frame loop submits to:
//! - [`CommandQueue`] - FIFO submission and fence signalling
//! - [`SimulatedQueue`] - software GPU executing on its own thread
//!
//! # Ordering
//!
//! A queue executes submissions in the order they were made and applies a
//! fence signal only after every submission queued before it has executed.
//! This is what makes a signaled fence value mean "everything up to here is
//! done".
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use frameflight_rhi::command::CommandBuffer;
//! use frameflight_rhi::queue::{CommandQueue, SimulatedQueue};
//! use frameflight_rhi::sync::{Fence, FenceValue, TimelineFence};
//!
//! # fn example() -> Result<(), frameflight_rhi::RhiError> {
//! let queue = SimulatedQueue::new(Duration::from_millis(1));
//! let fence: Arc<dyn Fence> = Arc::new(TimelineFence::new());
//!
//! let mut cmd = CommandBuffer::new("frame");
//! cmd.begin()?;
//! cmd.end()?;
//!
//! queue.submit(&cmd)?;
//! queue.signal(&fence, FenceValue::new(1))?;
//! fence.wait_for_value(FenceValue::new(1), None)?;
//! assert_eq!(queue.stats().submissions, 1);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::command::{Command, CommandBuffer, CommandBufferState};
use crate::error::{RhiError, RhiResult};
use crate::sync::{Fence, FenceValue};

/// A GPU command queue.
pub trait CommandQueue: Send + Sync {
    /// Queues an executable command buffer for execution.
    ///
    /// Returns once the commands are queued, not once they have executed.
    fn submit(&self, buffer: &CommandBuffer) -> RhiResult<()>;

    /// Queues a signal of `fence` to `value` behind all prior submissions.
    fn signal(&self, fence: &Arc<dyn Fence>, value: FenceValue) -> RhiResult<()>;
}

/// Checks that `buffer` was closed before submission.
pub fn ensure_executable(buffer: &CommandBuffer) -> RhiResult<()> {
    if buffer.state() != CommandBufferState::Executable {
        return Err(RhiError::InvalidState(format!(
            "command buffer '{}' submitted in state {:?}",
            buffer.label(),
            buffer.state()
        )));
    }
    Ok(())
}

/// Execution counters of a [`SimulatedQueue`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Command buffers executed.
    pub submissions: u64,
    /// Draw commands executed.
    pub draws: u64,
    /// Fence signals applied.
    pub signals: u64,
}

#[derive(Debug, Default)]
struct AtomicQueueStats {
    submissions: AtomicU64,
    draws: AtomicU64,
    signals: AtomicU64,
}

impl AtomicQueueStats {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            submissions: self.submissions.load(Ordering::Acquire),
            draws: self.draws.load(Ordering::Acquire),
            signals: self.signals.load(Ordering::Acquire),
        }
    }
}

enum Work {
    Execute(Vec<Command>),
    Signal(Arc<dyn Fence>, FenceValue),
}

/// Software GPU queue.
///
/// Submissions are copied into a channel and executed by a dedicated worker
/// thread, one at a time, each taking `latency` of simulated GPU time. Fence
/// signals travel through the same channel, so they retire strictly after
/// the work queued before them.
///
/// Dropping the queue lets the worker drain what is already queued and joins
/// it.
pub struct SimulatedQueue {
    sender: Mutex<Option<Sender<Work>>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<AtomicQueueStats>,
}

impl SimulatedQueue {
    /// Creates the queue and starts its worker thread.
    pub fn new(latency: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let stats = Arc::new(AtomicQueueStats::default());

        let worker_stats = stats.clone();
        let worker = thread::Builder::new()
            .name("simulated-gpu".to_string())
            .spawn(move || Self::run(receiver, latency, &worker_stats))
            .map_err(|e| error!("Failed to spawn simulated GPU thread: {}", e))
            .ok();

        info!("Simulated GPU queue started (latency {:?})", latency);

        Self {
            sender: Mutex::new(worker.as_ref().map(|_| sender)),
            worker,
            stats,
        }
    }

    fn run(receiver: Receiver<Work>, latency: Duration, stats: &AtomicQueueStats) {
        for work in receiver {
            match work {
                Work::Execute(commands) => {
                    if !latency.is_zero() {
                        thread::sleep(latency);
                    }
                    let draws = commands
                        .iter()
                        .filter(|c| matches!(c, Command::DrawIndexed { .. }))
                        .count() as u64;
                    stats.draws.fetch_add(draws, Ordering::AcqRel);
                    stats.submissions.fetch_add(1, Ordering::AcqRel);
                }
                Work::Signal(fence, value) => {
                    // Counted first so a waiter woken by the signal sees it.
                    stats.signals.fetch_add(1, Ordering::AcqRel);
                    if let Err(e) = fence.signal(value) {
                        error!("Simulated GPU failed to signal fence {}: {}", value, e);
                    }
                }
            }
        }
        debug!("Simulated GPU queue drained");
    }

    fn send(&self, work: Work) -> RhiResult<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        sender
            .as_ref()
            .ok_or(RhiError::QueueClosed)?
            .send(work)
            .map_err(|_| RhiError::QueueClosed)
    }

    /// Returns a snapshot of the execution counters.
    pub fn stats(&self) -> QueueStats {
        self.stats.snapshot()
    }
}

impl CommandQueue for SimulatedQueue {
    fn submit(&self, buffer: &CommandBuffer) -> RhiResult<()> {
        ensure_executable(buffer)?;
        self.send(Work::Execute(buffer.commands().to_vec()))
    }

    fn signal(&self, fence: &Arc<dyn Fence>, value: FenceValue) -> RhiResult<()> {
        self.send(Work::Signal(fence.clone(), value))
    }
}

impl Drop for SimulatedQueue {
    fn drop(&mut self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("Simulated GPU thread panicked");
        }
        let stats = self.stats.snapshot();
        info!(
            "Simulated GPU queue stopped ({} submissions, {} draws)",
            stats.submissions, stats.draws
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::TimelineFence;

    fn closed_buffer(draws: u32) -> CommandBuffer {
        let mut cmd = CommandBuffer::new("test");
        cmd.begin().unwrap();
        for i in 0..draws {
            cmd.draw_indexed(3, i * 3, 0);
        }
        cmd.end().unwrap();
        cmd
    }

    #[test]
    fn test_signal_follows_prior_submissions() {
        let queue = SimulatedQueue::new(Duration::from_millis(5));
        let fence: Arc<dyn Fence> = Arc::new(TimelineFence::new());

        for value in 1..=3 {
            queue.submit(&closed_buffer(2)).unwrap();
            queue.signal(&fence, FenceValue::new(value)).unwrap();
        }

        fence.wait_for_value(FenceValue::new(3), None).unwrap();
        let stats = queue.stats();
        assert_eq!(stats.submissions, 3);
        assert_eq!(stats.draws, 6);
        assert_eq!(stats.signals, 3);
    }

    #[test]
    fn test_open_buffer_is_rejected() {
        let queue = SimulatedQueue::new(Duration::ZERO);
        let mut cmd = CommandBuffer::new("open");
        cmd.begin().unwrap();
        assert!(matches!(
            queue.submit(&cmd),
            Err(RhiError::InvalidState(_))
        ));
    }

    #[test]
    fn test_drop_drains_queued_work() {
        let fence = Arc::new(TimelineFence::new());
        {
            let queue = SimulatedQueue::new(Duration::from_millis(2));
            let dyn_fence: Arc<dyn Fence> = fence.clone();
            queue.submit(&closed_buffer(1)).unwrap();
            queue.signal(&dyn_fence, FenceValue::new(1)).unwrap();
        }
        assert_eq!(fence.completed_value().unwrap(), FenceValue::new(1));
    }

    #[test]
    fn test_simulated_queue_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SimulatedQueue>();
    }
}
