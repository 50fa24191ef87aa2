#![forbid(unsafe_code)]

pub mod alignment;
pub mod analytics;
pub mod attention;
pub mod model;
pub mod time;
pub mod warning;

pub use time::Clock;
