//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - categorical inputs (`LoanGrade`, `HomeOwnership`)
//! - dataset rows (`ApplicantRecord`) and form input (`ApplicantInput`)
//! - scoring output (`Prediction`, `RiskLabel`)

pub mod types;

pub use types::*;
