//! Fixed categorical encoding tables.
//!
//! The tables are part of the model contract: changing a code silently
//! invalidates every trained artifact, so `encoding_fingerprint` feeds the
//! artifact schema tag.

use crate::domain::{HomeOwnership, LoanGrade};

/// Encode both categorical inputs: `(grade_code, ownership_code)`.
pub fn encode(grade: LoanGrade, ownership: HomeOwnership) -> (u8, u8) {
    (grade.code(), ownership.code())
}

/// Canonical text rendering of both tables, e.g. `A=1,B=2,...;RENT=0,...`.
pub fn encoding_fingerprint() -> String {
    let grades: Vec<String> = LoanGrade::ALL
        .iter()
        .map(|g| format!("{}={}", g.letter(), g.code()))
        .collect();
    let owners: Vec<String> = HomeOwnership::ALL
        .iter()
        .map(|h| format!("{}={}", h.label(), h.code()))
        .collect();
    format!("{};{}", grades.join(","), owners.join(","))
}
