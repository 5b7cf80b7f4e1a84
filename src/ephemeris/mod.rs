//! Solar ephemeris lookups.
//!
//! A provider turns a [`LookupRequest`] (observer coordinates plus a
//! simulated date/time) into the sun's [`SolarAngles`]. Every failure is a
//! [`LookupError`]; the dispatch layer reports it and moves on, so errors
//! from here never reach the clock.

pub mod payload;
pub mod usno;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::solar::calendar::ClockStamp;
use crate::solar::transform::SolarAngles;

pub use usno::UsnoProvider;

/// Observer position in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
    pub latitude: f64,
    pub longitude: f64,
}

impl Observer {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// One sun-position query, numbered in issue order.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupRequest {
    pub sequence: u64,
    pub observer: Observer,
    pub stamp: ClockStamp,
}

/// Which half of the failure taxonomy an error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupErrorKind {
    /// Network failure, non-success status or timeout.
    Transport,
    /// The response arrived but lacked the expected shape.
    Payload,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("ephemeris service returned HTTP {0}")]
    Status(u16),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("response has no data field")]
    MissingData,

    #[error("response has no Sun entry")]
    NoSunEntry,

    #[error("Sun entry is missing field `{0}`")]
    MissingField(&'static str),
}

impl LookupError {
    pub fn kind(&self) -> LookupErrorKind {
        match self {
            Self::Transport(_) | Self::Status(_) | Self::Timeout(_) => LookupErrorKind::Transport,
            Self::MalformedPayload(_)
            | Self::MissingData
            | Self::NoSunEntry
            | Self::MissingField(_) => LookupErrorKind::Payload,
        }
    }
}

/// Source of sun angles for a place and time.
///
/// Implementations may take arbitrarily long; callers apply their own
/// timeout.
pub trait EphemerisProvider: Send + Sync + 'static {
    fn lookup(
        &self,
        request: &LookupRequest,
    ) -> impl Future<Output = Result<SolarAngles, LookupError>> + Send;
}
