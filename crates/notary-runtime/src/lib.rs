//! # Notary Runtime
//!
//! Configuration, telemetry and wiring for the `notary` command.
//!
//! ```text
//! config.rs         NotaryConfig (defaults → environment → flags)
//! telemetry.rs      tracing-subscriber setup
//! contract_file.rs  deployed address between runs
//! notary.rs         component wiring
//! ```

pub mod config;
pub mod contract_file;
pub mod notary;
pub mod telemetry;

pub use config::{ConfigError, NotaryConfig};
pub use notary::{Access, Notary};
