//! Seeded train/test split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::AppError;

/// Index partition produced by `train_test_split`.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and carve off `ceil(n * test_fraction)` test rows.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<Split, AppError> {
    if !(test_fraction.is_finite() && test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AppError::invalid(format!(
            "Invalid test fraction {test_fraction} (must be in (0, 1))."
        )));
    }

    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(AppError::new(
            3,
            format!("Not enough rows to split: n={n}, test_fraction={test_fraction}."),
        ));
    }

    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let train = idx.split_off(n_test);
    Ok(Split { train, test: idx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sizes_round_test_up() {
        let s = train_test_split(101, 0.2, 42).unwrap();
        assert_eq!(s.test.len(), 21);
        assert_eq!(s.train.len(), 80);

        let mut all: Vec<usize> = s.train.iter().chain(s.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_seeded() {
        let a = train_test_split(50, 0.2, 7).unwrap();
        let b = train_test_split(50, 0.2, 7).unwrap();
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn split_rejects_tiny_inputs() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(train_test_split(10, 1.5, 42).is_err());
    }
}
