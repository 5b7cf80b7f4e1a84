//! Simulated-time clock that drives sun lookups.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::ephemeris::Observer;
use crate::scene::display::ClockDisplay;
use crate::solar::calendar::{ClockStamp, MAX_STEP_MINUTES};
use crate::solar::config::SimulationConfig;
use crate::solar::dispatch::LookupQueue;

/// Whether the clock advances on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    #[default]
    Idle,
    Running,
}

/// Owns the simulated date/time and advances it by a fixed step whenever
/// enough wall-clock time has accumulated while running.
///
/// Each advance shows the new stamp on the display and queues an ephemeris
/// lookup. The clock never waits for lookups: ordering and failure handling
/// live in the [dispatch queue](crate::solar::dispatch).
pub struct SimulationClock {
    stamp: ClockStamp,
    step_minutes: i64,
    threshold: Duration,
    elapsed: Duration,
    playback: Playback,
    observer: Observer,
    lookups: LookupQueue,
    display: Box<dyn ClockDisplay>,
}

impl SimulationClock {
    pub fn new(
        stamp: ClockStamp,
        step_minutes: i64,
        threshold: Duration,
        observer: Observer,
        lookups: LookupQueue,
        display: Box<dyn ClockDisplay>,
    ) -> Self {
        let clamped = step_minutes.clamp(1, MAX_STEP_MINUTES);
        if clamped != step_minutes {
            log::warn!("Clock step {step_minutes} min out of range, using {clamped}");
        }
        Self {
            stamp,
            step_minutes: clamped,
            threshold,
            elapsed: Duration::ZERO,
            playback: Playback::Idle,
            observer,
            lookups,
            display,
        }
    }

    /// Build from a validated configuration.
    pub fn from_config(
        config: &SimulationConfig,
        lookups: LookupQueue,
        display: Box<dyn ClockDisplay>,
    ) -> Result<Self> {
        let mut clock = Self::new(
            config.start_stamp()?,
            config.step_minutes,
            config.threshold(),
            config.observer(),
            lookups,
            display,
        );
        clock.set_running(config.start_running);
        Ok(clock)
    }

    /// Feed wall-clock time since the previous frame.
    ///
    /// Does nothing while idle. While running, advances once the accumulated
    /// time exceeds the threshold and returns the new stamp. At most one
    /// advance happens per call; the accumulator restarts from zero.
    pub fn tick(&mut self, dt: Duration) -> Option<ClockStamp> {
        if self.playback != Playback::Running {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed <= self.threshold {
            return None;
        }
        self.elapsed = Duration::ZERO;
        Some(self.advance())
    }

    /// Add one step to the simulated time, show it and queue a lookup.
    ///
    /// Works in either playback state.
    pub fn advance(&mut self) -> ClockStamp {
        self.stamp = self.stamp.add_minutes(self.step_minutes);
        log::debug!("Clock advanced to {}", self.stamp);
        self.display.show(&self.stamp);
        self.request_lookup();
        self.stamp
    }

    /// Queue a lookup for the current stamp without advancing.
    ///
    /// Returns the job sequence number, or `None` if the dispatcher has shut
    /// down. A closed queue never stops the clock.
    pub fn request_lookup(&mut self) -> Option<u64> {
        match self.lookups.submit_lookup(self.observer, self.stamp) {
            Ok(sequence) => Some(sequence),
            Err(e) => {
                log::warn!("Could not queue lookup for {}: {e}", self.stamp);
                None
            }
        }
    }

    /// Flip between idle and running. Returns the new state.
    pub fn toggle(&mut self) -> Playback {
        let running = self.playback != Playback::Running;
        self.set_running(running);
        self.playback
    }

    pub fn set_running(&mut self, running: bool) {
        let next = if running { Playback::Running } else { Playback::Idle };
        if next != self.playback {
            log::info!("Simulation {}", if running { "running" } else { "paused" });
            self.elapsed = Duration::ZERO;
        }
        self.playback = next;
    }

    /// Replace the simulated date/time without advancing or looking up.
    pub fn set_stamp(&mut self, stamp: ClockStamp) {
        self.stamp = stamp;
        self.display.show(&self.stamp);
    }

    /// Coordinates used by subsequent lookups.
    pub fn set_location(&mut self, observer: Observer) {
        self.observer = observer;
    }

    #[inline]
    pub fn stamp(&self) -> ClockStamp {
        self.stamp
    }

    #[inline]
    pub fn playback(&self) -> Playback {
        self.playback
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.playback == Playback::Running
    }

    #[inline]
    pub fn observer(&self) -> Observer {
        self.observer
    }

    #[inline]
    pub fn step_minutes(&self) -> i64 {
        self.step_minutes
    }

    #[inline]
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Handle to the lookup queue this clock feeds.
    pub fn lookups(&self) -> &LookupQueue {
        &self.lookups
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use glam::Vec3;

    use crate::scene::light::LightSource;
    use crate::solar::dispatch::tests::{Outcome, RecordingSink, ScriptedProvider};
    use crate::solar::dispatch::LookupDispatcher;
    use crate::solar::transform::{LightRig, SolarAngles};

    const FRAME: Duration = Duration::from_millis(16);

    struct Harness {
        clock: SimulationClock,
        provider: ScriptedProvider,
        sink: RecordingSink,
        shown: Arc<Mutex<Vec<String>>>,
    }

    fn harness(date: &str, time: &str) -> Harness {
        let provider = ScriptedProvider::default();
        let sink = RecordingSink::default();
        let (queue, _handle) = LookupDispatcher::new(
            provider.clone(),
            sink.clone(),
            LightRig::new(200.0, Vec3::ZERO),
            Duration::from_secs(10),
        )
        .spawn();

        let shown = Arc::new(Mutex::new(Vec::new()));
        let shown_writer = shown.clone();
        let display = move |stamp: &ClockStamp| {
            shown_writer.lock().unwrap().push(stamp.to_string());
        };

        let clock = SimulationClock::new(
            ClockStamp::parse(date, time).unwrap(),
            30,
            Duration::from_millis(200),
            Observer::new(42.3601, -71.0589),
            queue,
            Box::new(display),
        );
        Harness { clock, provider, sink, shown }
    }

    #[tokio::test]
    async fn test_starts_idle_and_ignores_ticks() {
        let mut h = harness("2024-06-21", "12:00");
        assert_eq!(h.clock.playback(), Playback::Idle);
        for _ in 0..100 {
            assert!(h.clock.tick(FRAME).is_none());
        }
        assert_eq!(h.clock.stamp().time_string(), "12:00");
        assert_eq!(h.clock.lookups().stats().issued, 0);
    }

    #[tokio::test]
    async fn test_tick_advances_only_past_threshold() {
        let mut h = harness("2024-06-21", "12:00");
        h.clock.toggle();

        // 200 ms exactly does not exceed the threshold.
        assert!(h.clock.tick(Duration::from_millis(100)).is_none());
        assert!(h.clock.tick(Duration::from_millis(100)).is_none());
        let stamp = h.clock.tick(Duration::from_millis(1)).unwrap();
        assert_eq!(stamp.time_string(), "12:30");

        // Accumulator restarted.
        assert!(h.clock.tick(Duration::from_millis(150)).is_none());
    }

    #[tokio::test]
    async fn test_one_advance_per_tick_even_after_long_stall() {
        let mut h = harness("2024-06-21", "12:00");
        h.clock.set_running(true);
        let stamp = h.clock.tick(Duration::from_secs(5)).unwrap();
        assert_eq!(stamp.time_string(), "12:30");
        assert!(h.clock.tick(FRAME).is_none());
    }

    #[tokio::test]
    async fn test_two_steps_from_noon() {
        let mut h = harness("2024-06-21", "12:00");
        h.clock.advance();
        let stamp = h.clock.advance();
        assert_eq!(stamp.to_string(), "2024-06-21T13:00");
    }

    #[tokio::test]
    async fn test_advance_crosses_midnight() {
        let mut h = harness("2024-06-21", "23:45");
        let stamp = h.clock.advance();
        assert_eq!(stamp.to_string(), "2024-06-22T00:15");
    }

    #[tokio::test]
    async fn test_leap_day_rollover() {
        let mut h = harness("2024-02-29", "23:45");
        h.clock.advance();
        let stamp = h.clock.advance();
        assert_eq!(stamp.to_string(), "2024-03-01T00:45");
    }

    #[tokio::test]
    async fn test_advance_shows_and_queues_lookup() {
        let mut h = harness("2024-06-21", "12:00");
        h.provider.respond(1, 0, Outcome::Angles(SolarAngles::new(70.0, 180.0)));
        h.clock.advance();
        h.clock.lookups().flush().await.unwrap();

        assert_eq!(*h.shown.lock().unwrap(), vec!["2024-06-21T12:30".to_string()]);
        assert_eq!(h.sink.sources(), vec![LightSource::Lookup { sequence: 1 }]);
        let p = h.sink.last_position().unwrap();
        assert!((p - Vec3::new(0.0, 187.94, 68.40)).length() < 0.1, "{p:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lookup_does_not_stop_the_clock() {
        let mut h = harness("2024-06-21", "12:00");
        h.provider.respond(1, 0, Outcome::Angles(SolarAngles::new(70.0, 180.0)));
        h.provider.respond(2, 0, Outcome::NoSun);
        h.clock.set_running(true);

        h.clock.tick(Duration::from_millis(201)).unwrap();
        h.clock.lookups().flush().await.unwrap();
        let good = h.sink.last_position().unwrap();

        h.clock.tick(Duration::from_millis(201)).unwrap();
        h.clock.lookups().flush().await.unwrap();
        assert_eq!(h.sink.last_position().unwrap(), good);

        // Next scheduled advance still happens and issues a fresh lookup.
        let stamp = h.clock.tick(Duration::from_millis(201)).unwrap();
        assert_eq!(stamp.time_string(), "13:30");
        h.clock.lookups().flush().await.unwrap();
        assert_eq!(h.clock.lookups().stats().issued, 3);
        assert_eq!(h.clock.lookups().stats().failed, 1);
        assert_eq!(h.sink.sources().last(), Some(&LightSource::Lookup { sequence: 3 }));
    }

    #[tokio::test]
    async fn test_toggle_resets_accumulator() {
        let mut h = harness("2024-06-21", "12:00");
        h.clock.toggle();
        assert!(h.clock.tick(Duration::from_millis(150)).is_none());
        assert_eq!(h.clock.toggle(), Playback::Idle);
        assert_eq!(h.clock.toggle(), Playback::Running);
        assert!(h.clock.tick(Duration::from_millis(150)).is_none());
    }

    #[tokio::test]
    async fn test_set_stamp_and_location_feed_next_lookup() {
        let mut h = harness("2024-06-21", "12:00");
        h.clock.set_stamp(ClockStamp::parse("2024-12-21", "09:00").unwrap());
        h.clock.set_location(Observer::new(-33.86, 151.21));
        assert_eq!(h.clock.stamp().to_string(), "2024-12-21T09:00");
        assert_eq!(h.clock.observer(), Observer::new(-33.86, 151.21));

        assert_eq!(h.clock.request_lookup(), Some(1));
        h.clock.lookups().flush().await.unwrap();
        assert_eq!(h.provider.events(), vec!["start 1", "end 1"]);
    }

    #[tokio::test]
    async fn test_from_config() {
        let provider = ScriptedProvider::default();
        let (queue, _handle) = LookupDispatcher::new(
            provider,
            RecordingSink::default(),
            LightRig::default(),
            Duration::from_secs(1),
        )
        .spawn();
        let mut config = SimulationConfig::default();
        config.start_running = true;
        config.step_minutes = 15;

        let mut clock =
            SimulationClock::from_config(&config, queue, Box::new(crate::scene::LogDisplay)).unwrap();
        assert!(clock.is_running());
        assert_eq!(clock.advance().time_string(), "12:15");
    }

    #[tokio::test]
    async fn test_step_clamped_to_one_day() {
        let (queue, _handle) = LookupDispatcher::new(
            ScriptedProvider::default(),
            RecordingSink::default(),
            LightRig::default(),
            Duration::from_secs(1),
        )
        .spawn();
        let mut clock = SimulationClock::new(
            ClockStamp::parse("2024-12-31", "12:00").unwrap(),
            3000,
            Duration::from_millis(200),
            Observer::new(0.0, 0.0),
            queue,
            Box::new(crate::scene::LogDisplay),
        );
        assert_eq!(clock.step_minutes(), MAX_STEP_MINUTES);
        assert_eq!(clock.advance().to_string(), "2025-01-01T12:00");
    }
}
