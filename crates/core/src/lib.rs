#![forbid(unsafe_code)]

pub mod achievements;
pub mod model;
pub mod progress;
pub mod time;

pub use time::Clock;
