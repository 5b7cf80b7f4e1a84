//! Control commands wired onto the running simulation.

use std::sync::{Arc, Mutex, MutexGuard};

use heliodon_control::{ControlCommand, ControlHandler, ControlResponse, ResponseData};

use crate::ephemeris::Observer;
use crate::scene::light::{LightSource, SharedLight};
use crate::solar::calendar::ClockStamp;
use crate::solar::clock::SimulationClock;
use crate::solar::transform::SolarAngles;

/// Clock shared between the host loop and the control server.
pub type SharedClock = Arc<Mutex<SimulationClock>>;

/// Applies control commands to the clock, the lookup queue and the light.
pub struct AppControlHandler {
    clock: SharedClock,
    light: SharedLight,
}

impl AppControlHandler {
    pub fn new(clock: SharedClock, light: SharedLight) -> Self {
        Self { clock, light }
    }

    fn clock(&self) -> MutexGuard<'_, SimulationClock> {
        self.clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clock_state(&self) -> ControlResponse {
        let clock = self.clock();
        let stamp = clock.stamp();
        let observer = clock.observer();
        ControlResponse::ok(ResponseData::ClockState {
            date: stamp.date_string(),
            time: stamp.time_string(),
            running: clock.is_running(),
            step_minutes: clock.step_minutes(),
            latitude: observer.latitude,
            longitude: observer.longitude,
        })
    }

    fn light_state(&self) -> ControlResponse {
        let light = self.light.snapshot();
        let source = match light.source {
            LightSource::Initial => "initial".to_string(),
            LightSource::Manual => "manual".to_string(),
            LightSource::Lookup { sequence } => format!("lookup #{sequence}"),
        };
        ControlResponse::ok(ResponseData::LightState {
            position: light.position.to_array(),
            target: light.target.to_array(),
            elevation: light.angles.elevation_deg,
            azimuth: light.angles.azimuth_deg,
            source,
            revision: light.revision,
        })
    }
}

impl ControlHandler for AppControlHandler {
    fn handle_command(&mut self, cmd: ControlCommand) -> ControlResponse {
        match cmd {
            ControlCommand::Ping => ControlResponse::pong(),

            ControlCommand::GetClockState => self.clock_state(),

            ControlCommand::TogglePlayback => {
                let state = self.clock().toggle();
                ControlResponse::updated(format!("playback {:?}", state))
            }

            ControlCommand::SetPlaying { playing } => {
                self.clock().set_running(playing);
                ControlResponse::updated(if playing { "playback Running" } else { "playback Idle" })
            }

            ControlCommand::StepClock => {
                self.clock().advance();
                self.clock_state()
            }

            ControlCommand::SetDateTime { date, time } => match ClockStamp::parse(&date, &time) {
                Ok(stamp) => {
                    self.clock().set_stamp(stamp);
                    self.clock_state()
                }
                Err(e) => ControlResponse::error(e.to_string()),
            },

            ControlCommand::SetLocation { latitude, longitude } => {
                if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
                    return ControlResponse::error(format!("latitude {latitude} outside [-90, 90]"));
                }
                if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
                    return ControlResponse::error(format!("longitude {longitude} outside [-180, 180]"));
                }
                self.clock().set_location(Observer::new(latitude, longitude));
                self.clock_state()
            }

            ControlCommand::LookupNow => match self.clock().request_lookup() {
                Some(sequence) => ControlResponse::ok(ResponseData::Queued { sequence }),
                None => ControlResponse::error("lookup queue closed"),
            },

            ControlCommand::SetSunAngles { elevation, azimuth } => {
                if !elevation.is_finite() || !azimuth.is_finite() {
                    return ControlResponse::error("angles must be finite");
                }
                let queued = self
                    .clock()
                    .lookups()
                    .submit_manual(SolarAngles::new(elevation, azimuth));
                match queued {
                    Ok(sequence) => ControlResponse::ok(ResponseData::Queued { sequence }),
                    Err(e) => ControlResponse::error(e.to_string()),
                }
            }

            ControlCommand::GetLightState => self.light_state(),

            ControlCommand::GetDispatchStats => {
                let stats = self.clock().lookups().stats();
                ControlResponse::ok(ResponseData::DispatchStats {
                    issued: stats.issued,
                    applied: stats.applied,
                    failed: stats.failed,
                    pending: stats.pending,
                    last_error: stats.last_error,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
