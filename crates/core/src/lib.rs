#![forbid(unsafe_code)]

pub mod mastery;
pub mod model;
pub mod time;

pub use mastery::MasteryLevel;
pub use time::Clock;
