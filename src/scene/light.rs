//! The directional "sun" light as seen by the scene graph.

use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::solar::transform::SolarAngles;

/// Where the most recently applied light placement came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightSource {
    /// Initial placement from configuration.
    Initial,
    /// Elevation/azimuth set by hand.
    Manual,
    /// Result of the ephemeris lookup with this sequence number.
    Lookup { sequence: u64 },
}

/// Receives light placements. The scene-graph side of the engine.
///
/// Position and aim are delivered separately; a sink must not touch any
/// other rendering property.
pub trait LightSink: Send + 'static {
    fn set_position(&mut self, position: Vec3);

    fn aim_at(&mut self, target: Vec3);

    /// Angles and origin of the placement just delivered.
    fn note_angles(&mut self, _angles: SolarAngles, _source: LightSource) {}

    /// Deliver one complete placement. Sinks with readers on other tasks
    /// override this so the update is observed all at once.
    fn place(&mut self, position: Vec3, target: Vec3, angles: SolarAngles, source: LightSource) {
        self.set_position(position);
        self.aim_at(target);
        self.note_angles(angles, source);
    }
}

/// CPU-side state of the directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub target: Vec3,
    pub angles: SolarAngles,
    pub source: LightSource,
    /// Number of placements applied so far.
    pub revision: u64,
}

impl DirectionalLight {
    /// Unit vector from the light toward its target.
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(150.0, 200.0, 100.0),
            target: Vec3::ZERO,
            angles: SolarAngles::new(0.0, 0.0),
            source: LightSource::Initial,
            revision: 0,
        }
    }
}

/// Cloneable handle to a [`DirectionalLight`] shared between the dispatch
/// worker (writer) and the host loop / control server (readers).
#[derive(Clone, Debug, Default)]
pub struct SharedLight {
    inner: Arc<Mutex<DirectionalLight>>,
}

impl SharedLight {
    pub fn new(light: DirectionalLight) -> Self {
        Self {
            inner: Arc::new(Mutex::new(light)),
        }
    }

    /// Copy of the current light state.
    pub fn snapshot(&self) -> DirectionalLight {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, DirectionalLight> {
        // A panic while holding the guard cannot leave a torn Copy value.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LightSink for SharedLight {
    fn set_position(&mut self, position: Vec3) {
        let mut light = self.lock();
        light.position = position;
        light.revision += 1;
    }

    fn aim_at(&mut self, target: Vec3) {
        self.lock().target = target;
    }

    fn note_angles(&mut self, angles: SolarAngles, source: LightSource) {
        let mut light = self.lock();
        light.angles = angles;
        light.source = source;
    }

    fn place(&mut self, position: Vec3, target: Vec3, angles: SolarAngles, source: LightSource) {
        let mut light = self.lock();
        light.position = position;
        light.target = target;
        light.angles = angles;
        light.source = source;
        light.revision += 1;
    }
}
