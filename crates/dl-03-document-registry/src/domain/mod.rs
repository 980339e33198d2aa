//! # Domain Layer

pub mod errors;
pub mod verification;

pub use errors::RegistryError;
pub use verification::Verification;
