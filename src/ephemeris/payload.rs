//! Ephemeris response parsing.
//!
//! Expected shape:
//!
//! ```json
//! { "properties": { "data": [
//!     { "object": "Sun", "almanac_data": { "hc": 70.1, "zn": 180.2 } }
//! ] } }
//! ```
//!
//! `hc` is the observed elevation and `zn` the true azimuth, both degrees.
//! A value of `0` is a valid reading; only an absent or `null` field counts
//! as missing.

use serde::Deserialize;

use super::LookupError;
use crate::solar::transform::SolarAngles;

const SUN_OBJECT: &str = "Sun";

#[derive(Debug, Deserialize)]
struct CelnavResponse {
    properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    data: Option<Vec<CelestialEntry>>,
}

#[derive(Debug, Deserialize)]
struct CelestialEntry {
    object: Option<String>,
    almanac_data: Option<AlmanacData>,
}

#[derive(Debug, Deserialize)]
struct AlmanacData {
    hc: Option<f64>,
    zn: Option<f64>,
}

/// Extract the Sun's elevation and azimuth from a response body.
pub fn parse_sun_angles(body: &str) -> Result<SolarAngles, LookupError> {
    let response: CelnavResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::MalformedPayload(e.to_string()))?;

    let entries = response
        .properties
        .and_then(|p| p.data)
        .ok_or(LookupError::MissingData)?;

    let sun = entries
        .into_iter()
        .find(|entry| entry.object.as_deref() == Some(SUN_OBJECT))
        .ok_or(LookupError::NoSunEntry)?;

    let almanac = sun.almanac_data.ok_or(LookupError::MissingField("almanac_data"))?;
    let elevation = almanac.hc.ok_or(LookupError::MissingField("hc"))?;
    let azimuth = almanac.zn.ok_or(LookupError::MissingField("zn"))?;

    Ok(SolarAngles::new(elevation as f32, azimuth as f32))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
