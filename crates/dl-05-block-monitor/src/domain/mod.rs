//! # Domain Layer

pub mod config;
pub mod errors;
pub mod report;

pub use config::{MonitorConfig, StartPoint, DEFAULT_MAX_BACKOFF, DEFAULT_POLL_INTERVAL};
pub use errors::MonitorError;
pub use report::PollReport;
