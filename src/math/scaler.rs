//! Per-feature standardization (`z = (x - mean) / scale`).
//!
//! Statistics match the usual "standard scaler" definition:
//! - mean and *population* variance (ddof = 0) per column
//! - a zero-variance column gets `scale = 1.0` so it maps to 0 instead of NaN
//!
//! The scaler is fitted once on the training split and stored inside the model
//! artifact; inference reuses it unchanged.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{EncodedVector, FEATURE_COUNT};
use crate::error::AppError;

/// Columns whose standard deviation falls below this are treated as constant.
const MIN_SCALE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: EncodedVector,
    pub scale: EncodedVector,
    pub n_samples: usize,
}

impl StandardScaler {
    /// Fit column statistics over `rows`.
    pub fn fit(rows: &[EncodedVector]) -> Result<Self, AppError> {
        if rows.is_empty() {
            return Err(AppError::new(3, "Cannot fit scaler on zero rows."));
        }
        if rows.iter().any(|r| r.iter().any(|v| !v.is_finite())) {
            return Err(AppError::new(4, "Cannot fit scaler on non-finite values."));
        }

        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let m = DMatrix::from_row_slice(rows.len(), FEATURE_COUNT, &flat);

        // `row_mean` / `row_variance` reduce over rows, i.e. one value per column.
        let means = m.row_mean();
        let variances = m.row_variance();

        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];
        for j in 0..FEATURE_COUNT {
            mean[j] = means[j];
            let std = variances[j].max(0.0).sqrt();
            scale[j] = if std < MIN_SCALE { 1.0 } else { std };
        }

        Ok(Self {
            mean,
            scale,
            n_samples: rows.len(),
        })
    }

    /// Standardize one vector.
    pub fn transform(&self, v: &EncodedVector) -> EncodedVector {
        let mut out = [0.0; FEATURE_COUNT];
        for j in 0..FEATURE_COUNT {
            out[j] = (v[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn transform_all(&self, rows: &[EncodedVector]) -> Vec<EncodedVector> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_uses_population_variance() {
        let rows = vec![
            [1.0, 10.0, 0.0, 5.0, 1.0, 0.0],
            [3.0, 30.0, 0.0, 5.0, 3.0, 2.0],
        ];
        let s = StandardScaler::fit(&rows).unwrap();
        assert_eq!(s.mean[0], 2.0);
        assert!((s.scale[0] - 1.0).abs() < 1e-12);
        assert!((s.scale[1] - 10.0).abs() < 1e-12);
        // Constant columns keep unit scale.
        assert_eq!(s.scale[2], 1.0);
        assert_eq!(s.scale[3], 1.0);

        let z = s.transform(&rows[1]);
        assert!((z[0] - 1.0).abs() < 1e-12);
        assert!((z[1] - 1.0).abs() < 1e-12);
        assert_eq!(z[2], 0.0);
    }

    #[test]
    fn transform_is_bitwise_deterministic() {
        let rows = vec![
            [25.0, 40_000.0, 5_000.0, 9.1, 1.0, 0.0],
            [35.0, 60_000.0, 10_000.0, 11.5, 2.0, 2.0],
            [52.0, 120_000.0, 25_000.0, 14.2, 4.0, 1.0],
        ];
        let s = StandardScaler::fit(&rows).unwrap();
        let v = [35.0, 60_000.0, 10_000.0, 11.5, 2.0, 2.0];
        let a = s.transform(&v);
        let b = s.transform(&v);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn fit_rejects_empty_input() {
        assert_eq!(StandardScaler::fit(&[]).unwrap_err().exit_code(), 3);
    }
}
