//! Shared scoring / training logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! validate -> encode -> assemble -> scale -> predict -> label -> append
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{ApplicantInput, ApplicantRecord, EncodedVector, Prediction};
use crate::error::AppError;
use crate::features::{assemble, assemble_record};
use crate::fit::{TrainOutcome, TrainParams, train};
use crate::io::{DatasetStore, ModelBundle, UpdateSummary, save_model};
use crate::models::DECISION_THRESHOLD;

/// Everything computed for one scored applicant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub input: ApplicantInput,
    /// Unscaled model vector.
    pub vector: EncodedVector,
    pub prediction: Prediction,
}

/// Score one applicant. Pure: nothing is written.
pub fn score(bundle: &ModelBundle, input: &ApplicantInput) -> Result<ScoreOutcome, AppError> {
    input.validate()?;

    let vector = assemble(input);
    let scaled = bundle.scaler.transform(&vector);
    if scaled.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "Non-finite value after scaling."));
    }

    let probability = bundle.forest.predict_probability(&scaled);
    let status = u8::from(probability >= DECISION_THRESHOLD);
    let prediction = Prediction::new(status, probability);

    debug!(?vector, probability, status, "applicant scored");
    Ok(ScoreOutcome {
        input: input.clone(),
        vector,
        prediction,
    })
}

/// Score one applicant and append the scored row to the dataset.
///
/// The row is only appended once the prediction succeeded; a storage failure
/// leaves the dataset file as it was.
pub fn score_and_save(
    bundle: &ModelBundle,
    store: &mut DatasetStore,
    input: &ApplicantInput,
) -> Result<ScoreOutcome, AppError> {
    let outcome = score(bundle, input)?;
    let record = ApplicantRecord::scored(&outcome.input, &outcome.prediction);
    store.append(&record)?;

    info!(
        label = %outcome.prediction.label,
        probability = outcome.prediction.probability,
        rows = store.total_rows(),
        "scored applicant saved"
    );
    Ok(outcome)
}

/// Train on the dataset at `dataset` and write the artifact to `model`.
pub fn train_and_save(dataset: &Path, model: &Path, params: &TrainParams) -> Result<TrainOutcome, AppError> {
    let store = DatasetStore::open(dataset)?;
    if store.records().is_empty() {
        return Err(AppError::new(
            3,
            format!("Dataset '{}' has no usable rows.", dataset.display()),
        ));
    }

    let records: Vec<ApplicantRecord> = store.applicants().cloned().collect();
    let outcome = train(&records, params, &dataset.display().to_string())?;
    save_model(model, &outcome.bundle)?;
    Ok(outcome)
}

/// Score every parsed row and write the probability back.
///
/// `loan_status` is only filled where it was empty, and the label follows the
/// row's resulting `loan_status`. Rows whose features are not finite are left
/// untouched.
pub fn rescore(bundle: &ModelBundle, store: &mut DatasetStore) -> Result<UpdateSummary, AppError> {
    store.update_predictions(|rows| {
        let (targets, vectors): (Vec<usize>, Vec<EncodedVector>) = rows
            .iter()
            .filter_map(|r| Some((r.row, bundle.scaler.transform(&assemble_record(&r.record)?))))
            .unzip();

        if targets.is_empty() {
            return Err(AppError::new(3, "No rows to rescore."));
        }

        let scored = bundle.forest.predict_batch(&vectors);
        Ok(targets
            .into_iter()
            .zip(scored)
            .map(|(row, (status, p))| (row, Prediction::new(status, p)))
            .collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleParams, generate_applicants};
    use crate::domain::{HomeOwnership, LoanGrade, RecordSource, RiskLabel};
    use crate::models::ForestParams;

    fn trained_bundle() -> ModelBundle {
        let records = generate_applicants(&SampleParams {
            count: 200,
            seed: 9,
            ..SampleParams::default()
        })
        .unwrap();
        let params = TrainParams {
            forest: ForestParams {
                n_trees: 15,
                ..ForestParams::default()
            },
            ..TrainParams::default()
        };
        train(&records, &params, "synthetic").unwrap().bundle
    }

    fn reference_applicant() -> ApplicantInput {
        ApplicantInput {
            age: 35,
            annual_income: 60_000.0,
            loan_amount: 10_000.0,
            interest_rate: 11.5,
            loan_grade: LoanGrade::B,
            home_ownership: HomeOwnership::Own,
        }
    }

    #[test]
    fn end_to_end_score_and_append() {
        let bundle = trained_bundle();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        let mut store = DatasetStore::open(&path).unwrap();
        let before = store.records().len();

        let outcome = score_and_save(&bundle, &mut store, &reference_applicant()).unwrap();
        assert_eq!(outcome.vector, [35.0, 60_000.0, 10_000.0, 11.5, 2.0, 2.0]);
        let p = outcome.prediction;
        assert!(p.loan_status <= 1);
        assert!((0.0..=1.0).contains(&p.probability));

        let reopened = DatasetStore::open(&path).unwrap();
        assert_eq!(reopened.records().len(), before + 1);
        let row = &reopened.records().last().unwrap().record;
        assert_eq!(row.loan_status, Some(p.loan_status));
        assert_eq!(row.risk_label, Some(p.label));
        assert_eq!(row.risk_probability, Some(p.probability));
        assert_eq!(row.source, RecordSource::Predicted);
    }

    #[test]
    fn invalid_input_does_not_touch_the_dataset() {
        let bundle = trained_bundle();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        let mut store = DatasetStore::open(&path).unwrap();

        let mut input = reference_applicant();
        input.age = 17;
        let err = score_and_save(&bundle, &mut store, &input).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!path.exists());
    }

    #[test]
    fn scoring_is_a_pure_function_of_the_bundle() {
        let bundle = trained_bundle();
        let a = score(&bundle, &reference_applicant()).unwrap();
        let b = score(&bundle, &reference_applicant()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn train_save_then_rescore() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("credit.csv");
        let model = dir.path().join("model.rkm");

        let mut records = generate_applicants(&SampleParams {
            count: 120,
            seed: 4,
            ..SampleParams::default()
        })
        .unwrap();
        records[0].loan_status = None;
        DatasetStore::create(&data, &records).unwrap();

        let params = TrainParams {
            forest: ForestParams {
                n_trees: 10,
                ..ForestParams::default()
            },
            ..TrainParams::default()
        };
        let outcome = train_and_save(&data, &model, &params).unwrap();
        assert_eq!(outcome.report.rows_labeled, 119);

        let bundle = crate::io::load_model(&model).unwrap();
        let mut store = DatasetStore::open(&data).unwrap();
        let summary = rescore(&bundle, &mut store).unwrap();
        assert_eq!(summary.rows_updated, 120);
        assert_eq!(summary.status_filled, 1);
        // Every row's label agrees with its final loan_status.
        for r in store.applicants() {
            assert_eq!(r.risk_label, r.loan_status.map(RiskLabel::from_status));
        }
        assert_eq!(store.records()[0].record.source, RecordSource::Predicted);
        // Observed outcomes are kept.
        assert_eq!(store.records()[1].record.loan_status, records[1].loan_status);
    }

    #[test]
    fn training_an_empty_dataset_is_a_no_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = train_and_save(
            &dir.path().join("missing.csv"),
            &dir.path().join("m.rkm"),
            &TrainParams::default(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
