//! Control protocol - JSON command/response definitions
//!
//! One JSON object per line in each direction.

use serde::{Deserialize, Serialize};

/// Commands sent by a control client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum ControlCommand {
    /// Get simulated date/time, playback state and location
    GetClockState,
    /// Flip between paused and running
    TogglePlayback,
    /// Explicitly pause or run
    SetPlaying { playing: bool },
    /// Advance simulated time by one step now
    StepClock,
    /// Set simulated date (`YYYY-MM-DD`) and time (`HH:MM`)
    SetDateTime { date: String, time: String },
    /// Set observer latitude/longitude in degrees
    SetLocation { latitude: f64, longitude: f64 },
    /// Look up the sun for the current date/time without advancing
    LookupNow,
    /// Place the sun by hand (degrees)
    SetSunAngles { elevation: f32, azimuth: f32 },
    /// Get current light placement
    GetLightState,
    /// Get lookup queue counters
    GetDispatchStats,
    /// Ping (health check)
    Ping,
}

/// Responses from the control server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ControlResponse {
    #[serde(rename = "ok")]
    Ok { data: ResponseData },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Response data variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Pong { message: String },
    ClockState {
        date: String,
        time: String,
        running: bool,
        step_minutes: i64,
        latitude: f64,
        longitude: f64,
    },
    LightState {
        position: [f32; 3],
        target: [f32; 3],
        elevation: f32,
        azimuth: f32,
        source: String,
        revision: u64,
    },
    Queued { sequence: u64 },
    DispatchStats {
        issued: u64,
        applied: u64,
        failed: u64,
        pending: u64,
        last_error: Option<String>,
    },
    ParamsUpdated { description: String },
}

impl ControlResponse {
    pub fn ok(data: ResponseData) -> Self {
        Self::Ok { data }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error {
            message: msg.into(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(ResponseData::Pong {
            message: "pong".into(),
        })
    }

    pub fn updated(description: impl Into<String>) -> Self {
        Self::ok(ResponseData::ParamsUpdated {
            description: description.into(),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd: ControlCommand = serde_json::from_str(
            r#"{"cmd":"SetSunAngles","params":{"elevation":30.0,"azimuth":90.0}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            ControlCommand::SetSunAngles {
                elevation: 30.0,
                azimuth: 90.0
            }
        );

        let cmd: ControlCommand = serde_json::from_str(r#"{"cmd":"TogglePlayback"}"#).unwrap();
        assert_eq!(cmd, ControlCommand::TogglePlayback);
    }

    #[test]
    fn test_response_wire_format() {
        let json = serde_json::to_string(&ControlResponse::pong()).unwrap();
        assert_eq!(json, r#"{"status":"ok","data":{"message":"pong"}}"#);

        let json = serde_json::to_string(&ControlResponse::error("nope")).unwrap();
        assert_eq!(json, r#"{"status":"error","message":"nope"}"#);
    }

    #[test]
    fn test_ok_response_always_carries_data() {
        assert!(serde_json::from_str::<ControlResponse>(r#"{"status":"ok","data":null}"#).is_err());
        let resp: ControlResponse =
            serde_json::from_str(r#"{"status":"ok","data":{"sequence":4}}"#).unwrap();
        assert_eq!(resp, ControlResponse::ok(ResponseData::Queued { sequence: 4 }));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<ControlCommand>(r#"{"cmd":"Explode"}"#).is_err());
    }
}
