//! Sun position from astronomical angles.
//!
//! World frame: +X = East, +Y = Up, +Z = South (so -Z is North). Azimuth is
//! measured clockwise from true north, elevation above the horizon.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Elevation/azimuth pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarAngles {
    /// Degrees above the horizon. Nominally [-90, 90].
    pub elevation_deg: f32,
    /// Degrees clockwise from true north. Nominally [0, 360).
    pub azimuth_deg: f32,
}

impl SolarAngles {
    pub fn new(elevation_deg: f32, azimuth_deg: f32) -> Self {
        Self { elevation_deg, azimuth_deg }
    }
}

/// Place a light at `radius` from the origin in the direction given by the
/// angles.
///
/// Total over all real inputs. Elevations outside [-90, 90] and azimuths
/// outside [0, 360) are not clamped; trig periodicity handles wrapping and
/// below-horizon positions come out with negative Y.
pub fn position_from_angles(angles: SolarAngles, radius: f32) -> Vec3 {
    let elevation = angles.elevation_deg.to_radians();
    let azimuth = angles.azimuth_deg.to_radians();

    let horizontal = elevation.cos();
    let vertical = elevation.sin();

    Vec3::new(
        radius * horizontal * azimuth.sin(),
        radius * vertical,
        -radius * horizontal * azimuth.cos(),
    )
}

/// Fixed geometry of the sun light: its distance from the focal point and
/// the point it always aims at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightRig {
    pub radius: f32,
    pub target: Vec3,
}

impl LightRig {
    pub fn new(radius: f32, target: Vec3) -> Self {
        Self { radius, target }
    }

    /// Light position for the given angles, orbiting the origin.
    #[inline]
    pub fn position(&self, angles: SolarAngles) -> Vec3 {
        position_from_angles(angles, self.radius)
    }

    /// Point the light aims at, independent of its position.
    #[inline]
    pub fn target_point(&self) -> Vec3 {
        self.target
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::new(200.0, Vec3::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
