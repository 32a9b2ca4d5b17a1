//! Risk classifier: CART trees and the random forest built from them.
//!
//! Models are plain data (serde-serializable) so they can be bundled into the
//! model artifact and reloaded without retraining.

pub mod forest;
pub mod tree;

pub use forest::*;
pub use tree::*;
