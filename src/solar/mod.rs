//! Sun placement engine.
//!
//! [`transform`] maps elevation/azimuth to a light position. The
//! [`SimulationClock`] advances simulated time and issues lookups; the
//! [`LookupDispatcher`] settles them one at a time and applies the results to
//! a [`LightSink`](crate::scene::LightSink) in issue order.

pub mod calendar;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod transform;

// Re-exports
pub use calendar::ClockStamp;
pub use clock::{Playback, SimulationClock};
pub use config::SimulationConfig;
pub use dispatch::{DispatchSnapshot, DispatchStats, LookupDispatcher, LookupQueue};
pub use transform::{position_from_angles, LightRig, SolarAngles};
