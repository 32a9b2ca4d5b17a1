//! Binary classification metrics for the held-out split.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    /// `None` when nothing was predicted positive.
    pub precision: Option<f64>,
    /// `None` when the split has no positive rows.
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub confusion: ConfusionMatrix,
}

/// Compare predicted classes against observed ones. `None` for empty input.
pub fn evaluate(truth: &[u8], predicted: &[u8]) -> Option<ClassificationMetrics> {
    if truth.is_empty() || truth.len() != predicted.len() {
        return None;
    }

    let mut cm = ConfusionMatrix::default();
    for (&t, &p) in truth.iter().zip(predicted) {
        match (t == 1, p == 1) {
            (false, false) => cm.true_negative += 1,
            (false, true) => cm.false_positive += 1,
            (true, false) => cm.false_negative += 1,
            (true, true) => cm.true_positive += 1,
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { None } else { Some(num as f64 / den as f64) };

    let accuracy = (cm.true_positive + cm.true_negative) as f64 / cm.total() as f64;
    let precision = ratio(cm.true_positive, cm.true_positive + cm.false_positive);
    let recall = ratio(cm.true_positive, cm.true_positive + cm.false_negative);
    let f1 = match (precision, recall) {
        (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
        (Some(_), Some(_)) => Some(0.0),
        _ => None,
    };

    Some(ClassificationMetrics {
        accuracy,
        precision,
        recall,
        f1,
        confusion: cm,
    })
}
