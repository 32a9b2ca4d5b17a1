//! Input validation and feature vector assembly.

use crate::domain::{AGE_MAX, AGE_MIN, ApplicantInput, ApplicantRecord, EncodedVector};
use crate::error::AppError;
use crate::features::encoder::encode;

impl ApplicantInput {
    /// Validate a newly entered applicant.
    ///
    /// Age must be in `[AGE_MIN, AGE_MAX]`; monetary fields and the rate must
    /// be finite and non-negative.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(AGE_MIN..=AGE_MAX).contains(&self.age) {
            return Err(AppError::invalid(format!(
                "Age {} is outside the accepted range [{AGE_MIN}, {AGE_MAX}].",
                self.age
            )));
        }
        check_non_negative("annual income", self.annual_income)?;
        check_non_negative("loan amount", self.loan_amount)?;
        check_non_negative("interest rate", self.interest_rate)?;
        Ok(())
    }
}

fn check_non_negative(name: &str, v: f64) -> Result<(), AppError> {
    if !v.is_finite() || v < 0.0 {
        return Err(AppError::invalid(format!("Invalid {name} '{v}' (must be finite and >= 0).")));
    }
    Ok(())
}

/// Assemble the ordered model vector for an applicant.
pub fn assemble(input: &ApplicantInput) -> EncodedVector {
    let (grade_code, ownership_code) = encode(input.loan_grade, input.home_ownership);
    [
        input.age as f64,
        input.annual_income,
        input.loan_amount,
        input.interest_rate,
        grade_code as f64,
        ownership_code as f64,
    ]
}

/// Assemble the vector for a dataset row, or `None` if any feature is non-finite.
///
/// Historical rows are not range-validated; they only need to be usable numbers.
pub fn assemble_record(record: &ApplicantRecord) -> Option<EncodedVector> {
    let v = assemble(&record.input());
    if v.iter().all(|x| x.is_finite()) { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HomeOwnership, LoanGrade};

    fn applicant(age: u32) -> ApplicantInput {
        ApplicantInput {
            age,
            annual_income: 60_000.0,
            loan_amount: 10_000.0,
            interest_rate: 11.5,
            loan_grade: LoanGrade::B,
            home_ownership: HomeOwnership::Own,
        }
    }

    #[test]
    fn assemble_uses_fixed_order() {
        let v = assemble(&applicant(35));
        assert_eq!(v, [35.0, 60_000.0, 10_000.0, 11.5, 2.0, 2.0]);
    }

    #[test]
    fn age_bounds_are_inclusive() {
        assert!(applicant(18).validate().is_ok());
        assert!(applicant(70).validate().is_ok());
        assert_eq!(applicant(17).validate().unwrap_err().exit_code(), 2);
        assert!(applicant(71).validate().is_err());
    }

    #[test]
    fn negative_or_nan_amounts_are_rejected() {
        let mut a = applicant(30);
        a.loan_amount = -1.0;
        assert!(a.validate().is_err());

        let mut b = applicant(30);
        b.interest_rate = f64::NAN;
        assert!(b.validate().is_err());
    }
}
