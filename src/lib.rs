//! Heliodon - sun placement engine for an interactive building scene
//!
//! Drives a directional "sun" light either from manual elevation/azimuth or
//! from ephemeris lookups for a simulated date and time that advances on a
//! wall-clock cadence.

pub mod core;
pub mod solar;
pub mod ephemeris;
pub mod scene;
pub mod control;
