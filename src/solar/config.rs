//! Simulation configuration.

use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::ephemeris::usno;
use crate::ephemeris::Observer;
use crate::solar::calendar::{ClockStamp, MAX_STEP_MINUTES};
use crate::solar::transform::{LightRig, SolarAngles};

/// Everything the simulation needs from outside. Defaults reproduce the
/// reference behaviour: Boston on the June solstice, 30-minute steps every
/// 200 ms, light orbiting at radius 200.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Observer latitude in degrees, north positive.
    pub latitude: f64,
    /// Observer longitude in degrees, east positive.
    pub longitude: f64,
    /// Simulated start date, `YYYY-MM-DD`.
    pub start_date: String,
    /// Simulated start time, `HH:MM`.
    pub start_time: String,
    /// Simulated minutes added per advance.
    pub step_minutes: i64,
    /// Wall-clock milliseconds that must elapse between advances.
    pub step_threshold_ms: u64,
    /// Distance of the light from the origin.
    pub light_radius: f32,
    /// Point the light always aims at.
    pub light_target: [f32; 3],
    /// Manual elevation applied before the first lookup.
    pub initial_elevation: f32,
    /// Manual azimuth applied before the first lookup.
    pub initial_azimuth: f32,
    /// Start advancing immediately instead of waiting for a toggle.
    pub start_running: bool,
    /// Upper bound on a single ephemeris lookup.
    pub lookup_timeout_ms: u64,
    /// Ephemeris service endpoint.
    pub ephemeris_url: String,
    /// Control server port on 127.0.0.1.
    pub control_port: u16,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latitude: 42.3601,
            longitude: -71.0589,
            start_date: "2024-06-21".to_string(),
            start_time: "12:00".to_string(),
            step_minutes: 30,
            step_threshold_ms: 200,
            light_radius: 200.0,
            light_target: [0.0, 0.0, 0.0],
            initial_elevation: 45.0,
            initial_azimuth: 180.0,
            start_running: false,
            lookup_timeout_ms: 10_000,
            ephemeris_url: usno::DEFAULT_URL.to_string(),
            control_port: heliodon_control::DEFAULT_PORT,
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file (sync). Missing fields take their defaults.
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Basic numeric sanity. Does not check that the ephemeris URL is
    /// reachable.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::Config(format!("latitude {} outside [-90, 90]", self.latitude)));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::Config(format!("longitude {} outside [-180, 180]", self.longitude)));
        }
        if !(1..=MAX_STEP_MINUTES).contains(&self.step_minutes) {
            return Err(Error::Config(format!(
                "step_minutes {} outside [1, {MAX_STEP_MINUTES}]",
                self.step_minutes
            )));
        }
        if self.step_threshold_ms == 0 {
            return Err(Error::Config("step_threshold_ms must be positive".into()));
        }
        if !self.light_radius.is_finite() || self.light_radius <= 0.0 {
            return Err(Error::Config(format!("light_radius must be positive, got {}", self.light_radius)));
        }
        if self.light_target.iter().any(|c| !c.is_finite()) {
            return Err(Error::Config("light_target must be finite".into()));
        }
        if !self.initial_elevation.is_finite() || !self.initial_azimuth.is_finite() {
            return Err(Error::Config("initial angles must be finite".into()));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(Error::Config("lookup_timeout_ms must be positive".into()));
        }
        self.start_stamp()?;
        Ok(())
    }

    pub fn start_stamp(&self) -> Result<ClockStamp> {
        ClockStamp::parse(&self.start_date, &self.start_time)
    }

    pub fn observer(&self) -> Observer {
        Observer::new(self.latitude, self.longitude)
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.step_threshold_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn light_rig(&self) -> LightRig {
        LightRig::new(self.light_radius, Vec3::from(self.light_target))
    }

    pub fn initial_angles(&self) -> SolarAngles {
        SolarAngles::new(self.initial_elevation, self.initial_azimuth)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
