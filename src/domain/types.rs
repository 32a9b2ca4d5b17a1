//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - parsed from the dataset CSV and CLI flags
//! - fed through the scoring pipeline
//! - printed as JSON for scripting

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 6;

/// Dataset column names of the model inputs, in model order.
///
/// The order is load-bearing: the scaler and forest are fitted on vectors in
/// exactly this order, and the artifact schema tag is derived from it.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "person_age",
    "person_income",
    "loan_amnt",
    "loan_int_rate",
    "loan_grade",
    "person_home_ownership",
];

/// Human-readable feature labels for charts and reports.
pub const FEATURE_LABELS: [&str; FEATURE_COUNT] = [
    "Age",
    "Annual income (USD)",
    "Loan amount (USD)",
    "Interest rate (%)",
    "Loan grade",
    "Home ownership",
];

/// Inclusive age bounds accepted for newly scored applicants.
pub const AGE_MIN: u32 = 18;
pub const AGE_MAX: u32 = 70;

/// Ordered six-feature vector: `[age, income, loan, rate, grade_code, ownership_code]`.
pub type EncodedVector = [f64; FEATURE_COUNT];

/// Loan quality grade (A = lowest risk, G = highest risk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoanGrade {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl LoanGrade {
    pub const ALL: [LoanGrade; 7] = [
        LoanGrade::A,
        LoanGrade::B,
        LoanGrade::C,
        LoanGrade::D,
        LoanGrade::E,
        LoanGrade::F,
        LoanGrade::G,
    ];

    /// Fixed model code: A→1 … G→7.
    pub fn code(self) -> u8 {
        match self {
            LoanGrade::A => 1,
            LoanGrade::B => 2,
            LoanGrade::C => 3,
            LoanGrade::D => 4,
            LoanGrade::E => 5,
            LoanGrade::F => 6,
            LoanGrade::G => 7,
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            LoanGrade::A => "A",
            LoanGrade::B => "B",
            LoanGrade::C => "C",
            LoanGrade::D => "D",
            LoanGrade::E => "E",
            LoanGrade::F => "F",
            LoanGrade::G => "G",
        }
    }

    /// Next grade (wraps around), used by the TUI selector.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|g| *g == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous grade (wraps around), used by the TUI selector.
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|g| *g == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for LoanGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl FromStr for LoanGrade {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        LoanGrade::ALL
            .into_iter()
            .find(|g| g.letter().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| AppError::invalid(format!("Invalid loan grade '{trimmed}'. Expected one of: A, B, C, D, E, F, G.")))
    }
}

/// Home ownership status of the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HomeOwnership {
    Rent,
    Mortgage,
    Own,
    Other,
}

impl HomeOwnership {
    pub const ALL: [HomeOwnership; 4] = [
        HomeOwnership::Rent,
        HomeOwnership::Mortgage,
        HomeOwnership::Own,
        HomeOwnership::Other,
    ];

    /// Fixed model code: RENT→0, MORTGAGE→1, OWN→2, OTHER→3.
    pub fn code(self) -> u8 {
        match self {
            HomeOwnership::Rent => 0,
            HomeOwnership::Mortgage => 1,
            HomeOwnership::Own => 2,
            HomeOwnership::Other => 3,
        }
    }

    /// Canonical dataset label.
    pub fn label(self) -> &'static str {
        match self {
            HomeOwnership::Rent => "RENT",
            HomeOwnership::Mortgage => "MORTGAGE",
            HomeOwnership::Own => "OWN",
            HomeOwnership::Other => "OTHER",
        }
    }

    /// Longer description shown in the dashboard form.
    pub fn description(self) -> &'static str {
        match self {
            HomeOwnership::Rent => "Renting (no home yet)",
            HomeOwnership::Mortgage => "Mortgage",
            HomeOwnership::Own => "Owned outright",
            HomeOwnership::Other => "Other (lodging / official housing)",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|h| *h == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|h| *h == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for HomeOwnership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const FORM_LABELS: [(&str, HomeOwnership); 4] = [
    ("Sewa (Belum memiliki rumah)", HomeOwnership::Rent),
    ("KPR / Kredit Pemilikan Rumah", HomeOwnership::Mortgage),
    ("Milik Sendiri", HomeOwnership::Own),
    ("Lainnya (Menumpang / Rumah Dinas)", HomeOwnership::Other),
];

impl FromStr for HomeOwnership {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(h) = HomeOwnership::ALL
            .into_iter()
            .find(|h| h.label().eq_ignore_ascii_case(trimmed) || h.description().eq_ignore_ascii_case(trimmed))
        {
            return Ok(h);
        }

        // Form labels from the older web dashboard.
        let legacy = FORM_LABELS
            .iter()
            .find(|(label, _)| label.to_lowercase() == trimmed.to_lowercase())
            .map(|(_, h)| *h);

        legacy.ok_or_else(|| {
            AppError::invalid(format!(
                "Invalid home ownership '{trimmed}'. Expected one of: RENT, MORTGAGE, OWN, OTHER."
            ))
        })
    }
}

/// Display label derived from a predicted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLabel {
    /// `1 → High Risk`, anything else → `Low Risk`.
    pub fn from_status(status: u8) -> Self {
        if status == 1 { RiskLabel::High } else { RiskLabel::Low }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLabel::Low => "Low Risk",
            RiskLabel::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLabel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "high risk" | "risiko tinggi" => Ok(RiskLabel::High),
            "low risk" | "risiko rendah" => Ok(RiskLabel::Low),
            _ => Err(AppError::invalid(format!("Invalid risk label '{}'.", s.trim()))),
        }
    }
}

/// Whether a row's `loan_status` is a real outcome or a model prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// Historical row; `loan_status` (if present) is an observed outcome.
    #[default]
    Observed,
    /// Row appended by the scorer; `loan_status` holds the prediction.
    Predicted,
}

impl RecordSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordSource::Observed => "observed",
            RecordSource::Predicted => "predicted",
        }
    }
}

impl FromStr for RecordSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "observed" => Ok(RecordSource::Observed),
            "predicted" => Ok(RecordSource::Predicted),
            other => Err(AppError::invalid(format!("Invalid record source '{other}'."))),
        }
    }
}

/// Raw applicant attributes as entered on the form or CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantInput {
    pub age: u32,
    pub annual_income: f64,
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub loan_grade: LoanGrade,
    pub home_ownership: HomeOwnership,
}

/// One dataset row: applicant attributes plus optional scoring outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub age: u32,
    pub annual_income: f64,
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub loan_grade: LoanGrade,
    pub home_ownership: HomeOwnership,
    /// 0 = non-default, 1 = default. Absent on unscored historical rows.
    pub loan_status: Option<u8>,
    /// Probability of class 1 assigned by the model.
    pub risk_probability: Option<f64>,
    pub risk_label: Option<RiskLabel>,
    pub source: RecordSource,
}

impl ApplicantRecord {
    /// Build the row appended after scoring `input`.
    pub fn scored(input: &ApplicantInput, prediction: &Prediction) -> Self {
        Self {
            age: input.age,
            annual_income: input.annual_income,
            loan_amount: input.loan_amount,
            interest_rate: input.interest_rate,
            loan_grade: input.loan_grade,
            home_ownership: input.home_ownership,
            loan_status: Some(prediction.loan_status),
            risk_probability: Some(prediction.probability),
            risk_label: Some(prediction.label),
            source: RecordSource::Predicted,
        }
    }

    /// The model inputs of this row.
    pub fn input(&self) -> ApplicantInput {
        ApplicantInput {
            age: self.age,
            annual_income: self.annual_income,
            loan_amount: self.loan_amount,
            interest_rate: self.interest_rate,
            loan_grade: self.loan_grade,
            home_ownership: self.home_ownership,
        }
    }

    /// True when the row carries an observed outcome usable as a training label.
    pub fn has_observed_label(&self) -> bool {
        self.source == RecordSource::Observed && self.loan_status.is_some()
    }
}

/// Output of scoring one applicant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub loan_status: u8,
    /// Probability of class 1, rounded to 4 decimals.
    pub probability: f64,
    pub label: RiskLabel,
}

impl Prediction {
    pub fn new(loan_status: u8, probability: f64) -> Self {
        Self {
            loan_status,
            probability: round4(probability),
            label: RiskLabel::from_status(loan_status),
        }
    }
}

/// Round to 4 decimal places (the precision stored in the dataset).
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_codes_follow_letter_order() {
        let codes: Vec<u8> = LoanGrade::ALL.iter().map(|g| g.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!("b".parse::<LoanGrade>().unwrap(), LoanGrade::B);
        assert!("H".parse::<LoanGrade>().is_err());
    }

    #[test]
    fn ownership_parses_canonical_and_form_labels() {
        assert_eq!("own".parse::<HomeOwnership>().unwrap(), HomeOwnership::Own);
        assert_eq!(
            "KPR / Kredit Pemilikan Rumah".parse::<HomeOwnership>().unwrap(),
            HomeOwnership::Mortgage
        );
        assert_eq!(
            "Lainnya (Menumpang / Rumah Dinas)".parse::<HomeOwnership>().unwrap(),
            HomeOwnership::Other
        );
        let err = "CASTLE".parse::<HomeOwnership>().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn ownership_rejects_near_miss_text() {
        assert_eq!("milik sendiri".parse::<HomeOwnership>().unwrap(), HomeOwnership::Own);
        for text in ["Sewage", "sewa", "KPRX", "Milik Sendiri rumah", "Lainnya", "rental"] {
            let err = text.parse::<HomeOwnership>().unwrap_err();
            assert_eq!(err.exit_code(), 2, "{text}");
        }
    }

    #[test]
    fn risk_label_accepts_legacy_text() {
        assert_eq!("Risiko Tinggi".parse::<RiskLabel>().unwrap(), RiskLabel::High);
        assert_eq!("Low Risk".parse::<RiskLabel>().unwrap(), RiskLabel::Low);
        assert_eq!(RiskLabel::from_status(1).as_str(), "High Risk");
        assert_eq!(RiskLabel::from_status(0).as_str(), "Low Risk");
    }

    #[test]
    fn prediction_rounds_probability() {
        let p = Prediction::new(1, 0.734_567);
        assert_eq!(p.probability, 0.7346);
        assert_eq!(p.label, RiskLabel::High);
    }

    #[test]
    fn selectors_wrap_around() {
        assert_eq!(LoanGrade::G.next(), LoanGrade::A);
        assert_eq!(LoanGrade::A.prev(), LoanGrade::G);
        assert_eq!(HomeOwnership::Other.next(), HomeOwnership::Rent);
    }
}
