//! CART decision tree for binary classification (Gini impurity).
//!
//! The tree is grown on a (possibly repeated) list of sample indices so the
//! forest can pass bootstrap draws without copying rows. Nodes live in a flat
//! vector; children are referenced by index.
//!
//! Splits are axis-aligned: a sample goes left when `x[feature] <= threshold`.
//! Thresholds are midpoints between adjacent distinct training values.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::domain::{EncodedVector, FEATURE_COUNT};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Features examined per split (drawn at random without replacement).
    pub max_features: usize,
    /// Maximum depth (root = 0). `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Fraction of class-1 samples that reached this leaf.
        p1: f64,
        n: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Total weighted Gini decrease attributed to each feature (unnormalized).
    impurity_decrease: EncodedVector,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Sum of `n_child * gini(child)` over both children.
    child_score: f64,
}

impl DecisionTree {
    /// Grow a tree on `samples` (indices into `x` / `y`).
    ///
    /// `y` values must be 0 or 1. `samples` must be non-empty.
    pub fn fit(x: &[EncodedVector], y: &[u8], samples: Vec<usize>, params: &TreeParams, rng: &mut StdRng) -> Self {
        let mut nodes = vec![Node::Leaf { p1: 0.0, n: 0 }];
        let mut impurity_decrease = [0.0; FEATURE_COUNT];

        // (slot, samples at node, depth)
        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(0, samples, 0)];

        while let Some((slot, idx, depth)) = stack.pop() {
            let n = idx.len();
            let ones = idx.iter().filter(|&&i| y[i] == 1).count();
            let p1 = if n == 0 { 0.0 } else { ones as f64 / n as f64 };

            let can_split = n >= params.min_samples_split.max(2)
                && ones != 0
                && ones != n
                && params.max_depth.is_none_or(|d| depth < d);

            let best = if can_split { best_split(x, y, &idx, params, rng) } else { None };

            let Some(split) = best else {
                nodes[slot] = Node::Leaf { p1, n };
                continue;
            };

            impurity_decrease[split.feature] += weighted_gini(n, ones) - split.child_score;

            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                idx.into_iter().partition(|&i| x[i][split.feature] <= split.threshold);

            let left = nodes.len();
            nodes.push(Node::Leaf { p1: 0.0, n: 0 });
            let right = nodes.len();
            nodes.push(Node::Leaf { p1: 0.0, n: 0 });

            nodes[slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push((right, right_idx, depth + 1));
            stack.push((left, left_idx, depth + 1));
        }

        Self { nodes, impurity_decrease }
    }

    /// Probability of class 1 at the leaf reached by `v`.
    pub fn predict_probability(&self, v: &EncodedVector) -> f64 {
        let mut i = 0usize;
        loop {
            match &self.nodes[i] {
                Node::Leaf { p1, .. } => return *p1,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if v[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn impurity_decrease(&self) -> &EncodedVector {
        &self.impurity_decrease
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Depth of the deepest leaf (a single-leaf tree has depth 0).
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((i, d)) = stack.pop() {
            match &self.nodes[i] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((*left, d + 1));
                    stack.push((*right, d + 1));
                }
            }
        }
        max_depth
    }
}

/// `n * gini` for a node with `ones` class-1 samples out of `n`.
fn weighted_gini(n: usize, ones: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n_f = n as f64;
    let a = ones as f64;
    let b = (n - ones) as f64;
    n_f - (a * a + b * b) / n_f
}

fn best_split(
    x: &[EncodedVector],
    y: &[u8],
    idx: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let n = idx.len();
    let min_leaf = params.min_samples_leaf.max(1);
    let max_features = params.max_features.clamp(1, FEATURE_COUNT);

    let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
    features.shuffle(rng);

    let total_ones = idx.iter().filter(|&&i| y[i] == 1).count();
    let mut best: Option<SplitCandidate> = None;
    let mut visited = 0usize;
    let mut pairs: Vec<(f64, u8)> = Vec::with_capacity(n);

    for f in features {
        if visited >= max_features {
            break;
        }

        pairs.clear();
        pairs.extend(idx.iter().map(|&i| (x[i][f], y[i])));
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        // Constant features at this node do not count against `max_features`.
        if pairs[0].0 == pairs[n - 1].0 {
            continue;
        }
        visited += 1;

        let mut left_ones = 0usize;
        for i in 0..n - 1 {
            if pairs[i].1 == 1 {
                left_ones += 1;
            }
            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let (v_lo, v_hi) = (pairs[i].0, pairs[i + 1].0);
            if v_lo == v_hi {
                continue;
            }

            let score = weighted_gini(left_n, left_ones) + weighted_gini(right_n, total_ones - left_ones);
            if best.is_none_or(|b| score < b.child_score) {
                let mid = v_lo + (v_hi - v_lo) / 2.0;
                let threshold = if mid < v_hi { mid } else { v_lo };
                best = Some(SplitCandidate {
                    feature: f,
                    threshold,
                    child_score: score,
                });
            }
        }
    }

    best
}
