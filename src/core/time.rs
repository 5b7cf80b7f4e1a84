//! Frame timing for the host loop

use std::time::{Duration, Instant};

/// Measures wall-clock time between host-loop frames.
///
/// The delta is what the host feeds into
/// [`SimulationClock::tick`](crate::solar::SimulationClock::tick).
pub struct FrameTimer {
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a timer whose first delta is measured from `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            last_frame: start,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    /// Update timing as if the frame happened at `now`.
    ///
    /// A `now` earlier than the previous frame yields a zero delta.
    pub fn tick_at(&mut self, now: Instant) -> Duration {
        self.delta = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_count += 1;
        self.delta
    }

    /// Get delta time as Duration
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
