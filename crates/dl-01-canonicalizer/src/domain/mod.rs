//! # Domain Layer
//!
//! Pure hashing logic. File access is limited to `hash_file`.

pub mod canonical;
pub mod errors;
