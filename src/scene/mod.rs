//! Scene-side collaborators: the sun light and the clock display.

pub mod display;
pub mod light;

pub use display::{ClockDisplay, LogDisplay};
pub use light::{DirectionalLight, LightSink, LightSource, SharedLight};
