//! Feature encoding and vector assembly.
//!
//! - categorical encoding through the fixed grade / ownership tables (`encoder`)
//! - input validation and the ordered six-feature vector (`assembler`)

pub mod assembler;
pub mod encoder;

pub use assembler::*;
pub use encoder::*;
