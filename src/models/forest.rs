//! Random forest classifier (bagged CART trees).
//!
//! Training is data-parallel over trees (rayon). Each tree draws its bootstrap
//! sample and feature subsets from its own RNG, seeded from the forest seed and
//! the tree index, so results do not depend on thread scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{EncodedVector, FEATURE_COUNT};
use crate::error::AppError;
use crate::models::tree::{DecisionTree, TreeParams};

/// Decision threshold on the class-1 probability.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            // floor(sqrt(6))
            max_features: 2,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_features: self.max_features,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.n_trees == 0 {
            return Err(AppError::invalid("Forest needs at least one tree."));
        }
        if !(1..=FEATURE_COUNT).contains(&self.max_features) {
            return Err(AppError::invalid(format!(
                "max_features must be in 1..={FEATURE_COUNT}, got {}.",
                self.max_features
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(AppError::invalid("min_samples_leaf must be >= 1."));
        }
        Ok(())
    }
}

/// Size of a fitted forest, reported after training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForestShape {
    pub n_trees: usize,
    pub n_nodes: usize,
    pub n_leaves: usize,
    /// Deepest leaf over all trees.
    pub max_depth: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    params: ForestParams,
    importances: EncodedVector,
}

impl RandomForest {
    /// Fit the forest on standardized rows `x` with binary labels `y`.
    pub fn fit(x: &[EncodedVector], y: &[u8], params: &ForestParams) -> Result<Self, AppError> {
        params.validate()?;
        if x.is_empty() {
            return Err(AppError::new(3, "Cannot train a forest on zero rows."));
        }
        if x.len() != y.len() {
            return Err(AppError::new(
                4,
                format!("Feature/label length mismatch: {} rows vs {} labels.", x.len(), y.len()),
            ));
        }
        if let Some(bad) = y.iter().find(|&&v| v > 1) {
            return Err(AppError::invalid(format!("Labels must be 0 or 1, found {bad}.")));
        }

        let n = x.len();
        let tree_params = params.tree_params();

        let trees: Vec<DecisionTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, t));
                let samples: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(x, y, samples, &tree_params, &mut rng)
            })
            .collect();

        let importances = aggregate_importances(&trees);

        Ok(Self {
            trees,
            params: params.clone(),
            importances,
        })
    }

    /// Mean over trees of the leaf probability of class 1.
    pub fn predict_probability(&self, v: &EncodedVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_probability(v)).sum();
        sum / self.trees.len() as f64
    }

    /// Majority decision: 1 iff `predict_probability(v) >= 0.5`.
    pub fn predict(&self, v: &EncodedVector) -> u8 {
        decide(self.predict_probability(v))
    }

    /// `(class, probability)` for every row, computed in parallel.
    pub fn predict_batch(&self, rows: &[EncodedVector]) -> Vec<(u8, f64)> {
        rows.par_iter()
            .map(|v| {
                let p = self.predict_probability(v);
                (decide(p), p)
            })
            .collect()
    }

    /// Normalized mean-decrease-in-impurity per feature (sums to 1).
    pub fn feature_importances(&self) -> EncodedVector {
        self.importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Total node count across all trees.
    pub fn n_nodes(&self) -> usize {
        self.trees.iter().map(|t| t.n_nodes()).sum()
    }

    pub fn shape(&self) -> ForestShape {
        ForestShape {
            n_trees: self.n_trees(),
            n_nodes: self.n_nodes(),
            n_leaves: self.trees.iter().map(|t| t.n_leaves()).sum(),
            max_depth: self.trees.iter().map(|t| t.depth()).max().unwrap_or(0),
            max_features: self.params().max_features,
        }
    }
}

fn decide(p: f64) -> u8 {
    if p >= DECISION_THRESHOLD { 1 } else { 0 }
}

fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (tree as u64).wrapping_add(1).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

fn aggregate_importances(trees: &[DecisionTree]) -> EncodedVector {
    let mut acc = [0.0; FEATURE_COUNT];
    for tree in trees {
        let raw = tree.impurity_decrease();
        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            for j in 0..FEATURE_COUNT {
                acc[j] += raw[j] / total;
            }
        }
    }

    let sum: f64 = acc.iter().sum();
    if sum <= 0.0 {
        // No tree ever split (e.g. single-class data).
        return [1.0 / FEATURE_COUNT as f64; FEATURE_COUNT];
    }
    for v in acc.iter_mut() {
        *v /= sum;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<EncodedVector>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let rate = i as f64 / 10.0 - 3.0;
            let noise = ((i * 7) % 5) as f64 / 10.0;
            x.push([noise, -noise, 0.0, rate, (i % 7) as f64, (i % 4) as f64]);
            y.push(if rate > 0.0 { 1 } else { 0 });
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 25,
            ..ForestParams::default()
        }
    }

    #[test]
    fn forest_learns_threshold_on_rate() {
        let (x, y) = toy_data();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict(&[0.0, 0.0, 0.0, 2.5, 3.0, 1.0]), 1);
        assert_eq!(forest.predict(&[0.0, 0.0, 0.0, -2.5, 3.0, 1.0]), 0);
    }

    #[test]
    fn predict_agrees_with_probability_threshold() {
        let (x, y) = toy_data();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let points: Vec<EncodedVector> = (0..40)
            .map(|i| {
                let r = i as f64 / 5.0 - 4.0;
                [0.1, -0.1, 0.0, r, (i % 7) as f64, (i % 4) as f64]
            })
            .collect();
        for v in &points {
            let p = forest.predict_probability(v);
            assert!((0.0..=1.0).contains(&p));
            assert_eq!(forest.predict(v) == 1, p >= 0.5);
        }
        let batch = forest.predict_batch(&points);
        for (v, (class, p)) in points.iter().zip(batch) {
            assert_eq!(class, forest.predict(v));
            assert_eq!(p, forest.predict_probability(v));
        }
    }

    #[test]
    fn importances_are_normalized() {
        let (x, y) = toy_data();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let imp = forest.feature_importances();
        assert!(imp.iter().all(|v| *v >= 0.0));
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // The rate column drives the label.
        let top = imp
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(top, 3);
    }

    #[test]
    fn single_class_data_gives_uniform_importances() {
        let (x, _) = toy_data();
        let y = vec![0u8; x.len()];
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(forest.predict_probability(&x[0]), 0.0);
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let (x, y) = toy_data();
        let a = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let b = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shape_counts_nodes_and_respects_max_depth() {
        let (x, y) = toy_data();
        let params = ForestParams {
            max_depth: Some(3),
            ..small_params()
        };
        let shape = RandomForest::fit(&x, &y, &params).unwrap().shape();
        assert_eq!(shape.n_trees, 25);
        assert_eq!(shape.max_features, 2);
        assert!(shape.max_depth <= 3);
        // Binary trees: every split adds one leaf.
        assert_eq!(shape.n_nodes, 2 * shape.n_leaves - shape.n_trees);
    }

    #[test]
    fn rejects_bad_inputs() {
        let (x, y) = toy_data();
        assert!(RandomForest::fit(&x, &y[..10], &small_params()).is_err());
        assert!(RandomForest::fit(&[], &[], &small_params()).is_err());
        let bad = ForestParams {
            max_features: 0,
            ..small_params()
        };
        assert!(RandomForest::fit(&x, &y, &bad).is_err());
    }
}
