#![forbid(unsafe_code)]

pub mod error;
pub mod integrity;
pub mod model;
pub mod scoring;
pub mod time;
pub mod timer;

pub use time::Clock;
