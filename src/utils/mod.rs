//! Formatting helpers and the clock abstraction

pub mod clock;
pub mod helper;

pub use clock::{Clock, ManualClock, SystemClock};
