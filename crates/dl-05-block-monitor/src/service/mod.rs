pub mod monitor;

pub use monitor::{BlockMonitor, MonitorHandle};
