//! Input/output.
//!
//! - applicant dataset CSV store with locked, atomic rewrites (`dataset`)
//! - model artifact save/load with schema and checksum verification (`artifact`)

pub mod artifact;
pub mod dataset;

pub use artifact::*;
pub use dataset::*;
