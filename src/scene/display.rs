//! UI display sink for the simulated clock.

use crate::solar::calendar::ClockStamp;

/// Receives the simulated `(date, time)` after every advance.
pub trait ClockDisplay: Send {
    fn show(&mut self, stamp: &ClockStamp);
}

impl<F> ClockDisplay for F
where
    F: FnMut(&ClockStamp) + Send,
{
    fn show(&mut self, stamp: &ClockStamp) {
        self(stamp)
    }
}

/// Writes the simulated date and time to the log.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl ClockDisplay for LogDisplay {
    fn show(&mut self, stamp: &ClockStamp) {
        log::info!("Simulated time {} {}", stamp.date_string(), stamp.time_string());
    }
}
