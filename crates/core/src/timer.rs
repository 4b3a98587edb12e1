//! Frame timer producing total and delta time.

use std::time::{Duration, Instant};

/// Timing information handed to every per-frame update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the timer started.
    pub total: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
}

impl FrameTime {
    /// Advances `self` by `delta` seconds.
    #[inline]
    pub fn advanced(self, delta: f32) -> Self {
        Self {
            total: self.total + delta,
            delta,
        }
    }
}

/// High-resolution timer for measuring frame intervals.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
}

impl Timer {
    /// Starts a timer at the current instant.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Wall time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Marks a frame boundary and returns the time since the previous one.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        FrameTime {
            total: (now - self.start).as_secs_f32(),
            delta: delta.as_secs_f32(),
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_advanced_accumulates() {
        let t = FrameTime::default().advanced(0.25).advanced(0.5);
        assert_eq!(t.total, 0.75);
        assert_eq!(t.delta, 0.5);
    }

    #[test]
    fn test_tick_is_monotonic() {
        let mut timer = Timer::new();
        let a = timer.tick();
        let b = timer.tick();
        assert!(b.total >= a.total);
        assert!(b.delta >= 0.0);
    }
}
