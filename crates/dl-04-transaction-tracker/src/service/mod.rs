//! # Service Layer

pub mod tracker;

pub use tracker::{
    SubmissionSlot, TrackerConfig, TransactionTracker, DEFAULT_CONFIRMATION_TIMEOUT,
    DEFAULT_RECEIPT_POLL_INTERVAL,
};
