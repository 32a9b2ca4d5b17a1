//! Offline training.
//!
//! Responsibilities:
//!
//! - select rows with observed outcomes and assemble feature vectors
//! - seeded train/test split, scaler fit, forest fit
//! - held-out evaluation (accuracy, precision, recall, confusion matrix)

pub mod metrics;
pub mod trainer;

pub use metrics::*;
pub use trainer::*;
