//! # Block Monitor (dl-05)
//!
//! Follows the chain head and persists the receipt of every transaction in
//! every new block.
//!
//! ## Watermark
//!
//! The watermark is the last block whose transactions are all stored. It
//! only moves past a block once that block is complete, so a failure at
//! block `k` leaves it at `k - 1` and the next poll resumes at `k`. Inserts
//! are insert-if-absent, so re-processing a partial block is harmless.
//!
//! ## Module Structure
//!
//! ```text
//! domain/   MonitorConfig, StartPoint, PollReport, MonitorError
//! service/  BlockMonitor, MonitorHandle
//! ```

pub mod domain;
pub mod service;

pub use domain::*;
pub use service::{BlockMonitor, MonitorHandle};
