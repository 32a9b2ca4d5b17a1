//! Offline training: dataset rows -> scaler + forest + held-out evaluation.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ApplicantRecord, EncodedVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::error::AppError;
use crate::features::assemble_record;
use crate::fit::metrics::{ClassificationMetrics, evaluate};
use crate::io::{ModelBundle, TrainingMetadata};
use crate::math::{StandardScaler, train_test_split};
use crate::models::{ForestParams, ForestShape, RandomForest};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainParams {
    /// Fraction of labeled rows held out for evaluation.
    pub test_fraction: f64,
    /// Forest settings; `forest.seed` also drives the split.
    pub forest: ForestParams,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            forest: ForestParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: &'static str,
    pub importance: f64,
}

/// Summary printed after `risk train`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub rows_total: usize,
    /// Rows with an observed `loan_status` and finite features.
    pub rows_labeled: usize,
    /// Rows without an observed outcome (unscored or predicted).
    pub rows_skipped: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// `[non-default, default]` counts over the labeled rows.
    pub class_counts: [usize; 2],
    pub metrics: Option<ClassificationMetrics>,
    pub importances: Vec<FeatureImportance>,
    pub forest: ForestShape,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub bundle: ModelBundle,
    pub report: TrainingReport,
}

/// Select training rows: observed outcome present and every feature finite.
pub fn labeled_rows(records: &[ApplicantRecord]) -> (Vec<EncodedVector>, Vec<u8>) {
    records
        .iter()
        .filter(|r| r.has_observed_label())
        .filter_map(|r| Some((assemble_record(r)?, r.loan_status?)))
        .unzip()
}

/// Fit a model bundle on the observed rows of `records`.
pub fn train(records: &[ApplicantRecord], params: &TrainParams, dataset: &str) -> Result<TrainOutcome, AppError> {
    let (x, y) = labeled_rows(records);
    let rows_labeled = x.len();
    let rows_skipped = records.len() - rows_labeled;
    if rows_labeled == 0 {
        return Err(AppError::new(
            3,
            "No rows with an observed loan_status to train on.",
        ));
    }
    if rows_skipped > 0 {
        debug!(skipped = rows_skipped, "rows without observed outcome excluded from training");
    }

    let ones = y.iter().filter(|&&v| v == 1).count();
    let class_counts = [rows_labeled - ones, ones];
    if ones == 0 || ones == rows_labeled {
        warn!(?class_counts, "training data contains a single class");
    }

    let split = train_test_split(rows_labeled, params.test_fraction, params.forest.seed)?;
    let x_train: Vec<EncodedVector> = split.train.iter().map(|&i| x[i]).collect();
    let y_train: Vec<u8> = split.train.iter().map(|&i| y[i]).collect();
    let x_test: Vec<EncodedVector> = split.test.iter().map(|&i| x[i]).collect();
    let y_test: Vec<u8> = split.test.iter().map(|&i| y[i]).collect();

    info!(
        train = x_train.len(),
        test = x_test.len(),
        trees = params.forest.n_trees,
        seed = params.forest.seed,
        "training random forest"
    );

    let scaler = StandardScaler::fit(&x_train)?;
    let forest = RandomForest::fit(&scaler.transform_all(&x_train), &y_train, &params.forest)?;

    let predicted: Vec<u8> = forest
        .predict_batch(&scaler.transform_all(&x_test))
        .into_iter()
        .map(|(class, _)| class)
        .collect();
    let metrics = evaluate(&y_test, &predicted);
    if let Some(m) = &metrics {
        info!(accuracy = m.accuracy, "held-out evaluation");
    }

    let raw = forest.feature_importances();
    let importances = (0..FEATURE_COUNT)
        .map(|j| FeatureImportance {
            feature: FEATURE_NAMES[j],
            importance: raw[j],
        })
        .collect();

    let report = TrainingReport {
        rows_total: records.len(),
        rows_labeled,
        rows_skipped,
        n_train: x_train.len(),
        n_test: x_test.len(),
        class_counts,
        metrics,
        importances,
        forest: forest.shape(),
    };

    let metadata = TrainingMetadata {
        trained_at: Utc::now(),
        n_train: report.n_train,
        n_test: report.n_test,
        accuracy: metrics.map(|m| m.accuracy),
        seed: forest.params().seed,
        n_trees: forest.n_trees(),
        dataset: dataset.to_string(),
    };

    Ok(TrainOutcome {
        bundle: ModelBundle::new(scaler, forest, metadata),
        report,
    })
}
