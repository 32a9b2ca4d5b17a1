//! Dataset summaries behind the dashboard charts and `risk report`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ApplicantRecord, FEATURE_COUNT, FEATURE_NAMES, RiskLabel};
use crate::fit::FeatureImportance;
use crate::io::{DatasetStore, ModelBundle};
use crate::models::RandomForest;

pub mod format;

pub use format::*;

/// Counts of `loan_status` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassDistribution {
    /// `loan_status = 0`
    pub current: usize,
    /// `loan_status = 1`
    pub default: usize,
    /// No `loan_status` yet.
    pub unscored: usize,
}

/// Counts of `hasil_prediksi` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LabelDistribution {
    pub low: usize,
    pub high: usize,
    pub unlabeled: usize,
}

impl LabelDistribution {
    pub fn labeled(&self) -> usize {
        self.low + self.high
    }

    /// Share of `label` among labeled rows, in percent (0 when nothing is labeled).
    pub fn percent(&self, label: RiskLabel) -> f64 {
        let n = self.labeled();
        if n == 0 {
            return 0.0;
        }
        let k = match label {
            RiskLabel::Low => self.low,
            RiskLabel::High => self.high,
        };
        100.0 * k as f64 / n as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub trained_at: DateTime<Utc>,
    pub n_trees: usize,
    pub n_train: usize,
    pub accuracy: Option<f64>,
}

/// Everything the dashboard charts show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub dataset: String,
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub row_errors: usize,
    pub classes: ClassDistribution,
    pub labels: LabelDistribution,
    /// Ascending by importance (least important first), as charted.
    pub importances: Vec<FeatureImportance>,
    pub model: Option<ModelSummary>,
}

pub fn class_distribution<'a>(records: impl IntoIterator<Item = &'a ApplicantRecord>) -> ClassDistribution {
    let mut d = ClassDistribution::default();
    for r in records {
        match r.loan_status {
            Some(1) => d.default += 1,
            Some(_) => d.current += 1,
            None => d.unscored += 1,
        }
    }
    d
}

pub fn label_distribution<'a>(records: impl IntoIterator<Item = &'a ApplicantRecord>) -> LabelDistribution {
    let mut d = LabelDistribution::default();
    for r in records {
        match r.risk_label {
            Some(RiskLabel::Low) => d.low += 1,
            Some(RiskLabel::High) => d.high += 1,
            None => d.unlabeled += 1,
        }
    }
    d
}

/// Forest importances sorted ascending (ties keep feature order).
pub fn ranked_importances(forest: &RandomForest) -> Vec<FeatureImportance> {
    let raw = forest.feature_importances();
    let mut out: Vec<FeatureImportance> = (0..FEATURE_COUNT)
        .map(|j| FeatureImportance {
            feature: FEATURE_NAMES[j],
            importance: raw[j],
        })
        .collect();
    out.sort_by(|a, b| a.importance.total_cmp(&b.importance));
    out
}

pub fn summarize(store: &DatasetStore, bundle: Option<&ModelBundle>) -> DashboardSummary {
    DashboardSummary {
        dataset: store.path().display().to_string(),
        total_rows: store.total_rows(),
        parsed_rows: store.records().len(),
        row_errors: store.row_errors().len(),
        classes: class_distribution(store.applicants()),
        labels: label_distribution(store.applicants()),
        importances: bundle.map(|b| ranked_importances(&b.forest)).unwrap_or_default(),
        model: bundle.map(|b| ModelSummary {
            trained_at: b.metadata.trained_at,
            n_trees: b.forest.n_trees(),
            n_train: b.metadata.n_train,
            accuracy: b.metadata.accuracy,
        }),
    }
}

/// The last `n` parsed rows, oldest first.
pub fn recent_records(store: &DatasetStore, n: usize) -> Vec<&ApplicantRecord> {
    let rows = store.records();
    let start = rows.len().saturating_sub(n);
    rows[start..].iter().map(|r| &r.record).collect()
}
