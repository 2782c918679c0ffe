//! Regression trees and exact TreeSHAP attributions.
//!
//! Trees are stored as flat node arrays with the root at index 0. Every
//! node records its cover (the hessian sum of the training rows that reached
//! it), which is what the path-dependent TreeSHAP algorithm weighs
//! unobserved branches by.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Output of the leaf, learning rate already applied.
        value: f64,
        cover: f64,
    },
    Split {
        feature: usize,
        /// Rows with `x[feature] <= threshold` (or NaN) go left.
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Leaf { cover, .. } | Node::Split { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[inline]
fn goes_left(value: f64, threshold: f64) -> bool {
    value <= threshold || value.is_nan()
}

impl Tree {
    /// A single-leaf tree.
    pub fn leaf(value: f64, cover: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value, cover }],
        }
    }

    pub fn predict(&self, sample: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if goes_left(sample[*feature], *threshold) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Cover-weighted mean of the leaf values: the tree's output when no
    /// feature is known.
    pub fn expected_value(&self) -> f64 {
        let root_cover = self.nodes.first().map_or(0.0, Node::cover);
        if root_cover <= 0.0 {
            return 0.0;
        }
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Leaf { value, cover } => Some(value * cover),
                Node::Split { .. } => None,
            })
            .sum::<f64>()
            / root_cover
    }

    /// Add this tree's SHAP values for `sample` into `phi`.
    pub fn accumulate_shap(&self, sample: &[f64], phi: &mut [f64]) {
        if self.nodes.is_empty() {
            return;
        }
        let path = Vec::with_capacity(self.depth() + 2);
        self.shap_recurse(0, sample, phi, path, 1.0, 1.0, None);
    }

    #[allow(clippy::too_many_arguments)]
    fn shap_recurse(
        &self,
        idx: usize,
        sample: &[f64],
        phi: &mut [f64],
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        match &self.nodes[idx] {
            Node::Leaf { value, .. } => {
                for i in 1..path.len() {
                    let weight = unwound_path_sum(&path, i);
                    let element = path[i];
                    if let Some(f) = element.feature {
                        phi[f] += weight * (element.one_fraction - element.zero_fraction) * value;
                    }
                }
            }
            Node::Split {
                feature: split_feature,
                threshold,
                left,
                right,
                cover,
            } => {
                let (hot, cold) = if goes_left(sample[*split_feature], *threshold) {
                    (*left, *right)
                } else {
                    (*right, *left)
                };
                let hot_zero_fraction = self.nodes[hot].cover() / cover;
                let cold_zero_fraction = self.nodes[cold].cover() / cover;

                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;

                // A feature split on twice along one path is accounted once.
                if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(*split_feature)) {
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                self.shap_recurse(
                    hot,
                    sample,
                    phi,
                    path.clone(),
                    hot_zero_fraction * incoming_zero,
                    incoming_one,
                    Some(*split_feature),
                );
                self.shap_recurse(
                    cold,
                    sample,
                    phi,
                    path,
                    cold_zero_fraction * incoming_zero,
                    0.0,
                    Some(*split_feature),
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = depth as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i as f64 + 1.0) / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - i as f64) / (d + 1.0);
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (d - i as f64) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero_fraction * (d - i as f64));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * ((d - i as f64) / (d + 1.0));
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((d - i as f64) / (d + 1.0));
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x0 <= 0.5 ? (x1 <= 0.5 ? 1 : 2) : (x0 <= 1.5 ? 3 : 4)
    fn sample_tree() -> Tree {
        Tree {
            nodes: vec![
                Node::Split { feature: 0, threshold: 0.5, left: 1, right: 2, cover: 10.0 },
                Node::Split { feature: 1, threshold: 0.5, left: 3, right: 4, cover: 6.0 },
                Node::Split { feature: 0, threshold: 1.5, left: 5, right: 6, cover: 4.0 },
                Node::Leaf { value: 1.0, cover: 2.0 },
                Node::Leaf { value: 2.0, cover: 4.0 },
                Node::Leaf { value: 3.0, cover: 1.0 },
                Node::Leaf { value: 4.0, cover: 3.0 },
            ],
        }
    }

    #[test]
    fn test_predict_routes_nan_left() {
        let tree = sample_tree();
        assert_eq!(tree.predict(&[0.0, 0.0]), 1.0);
        assert_eq!(tree.predict(&[0.0, 1.0]), 2.0);
        assert_eq!(tree.predict(&[1.0, 0.0]), 3.0);
        assert_eq!(tree.predict(&[2.0, 0.0]), 4.0);
        assert_eq!(tree.predict(&[f64::NAN, f64::NAN]), 1.0);
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_expected_value_is_cover_weighted() {
        let expected = (1.0 * 2.0 + 2.0 * 4.0 + 3.0 * 1.0 + 4.0 * 3.0) / 10.0;
        assert!((sample_tree().expected_value() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_shap_values_are_additive() {
        let tree = sample_tree();
        let samples = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [f64::NAN, 1.0]];
        for sample in samples {
            let mut phi = vec![0.0; 2];
            tree.accumulate_shap(&sample, &mut phi);
            let total = phi.iter().sum::<f64>() + tree.expected_value();
            assert!(
                (total - tree.predict(&sample)).abs() < 1e-9,
                "sample {sample:?}: {total} vs {}",
                tree.predict(&sample)
            );
        }
    }

    #[test]
    fn test_unused_feature_gets_zero() {
        let tree = Tree {
            nodes: vec![
                Node::Split { feature: 1, threshold: 0.0, left: 1, right: 2, cover: 4.0 },
                Node::Leaf { value: -1.0, cover: 2.0 },
                Node::Leaf { value: 1.0, cover: 2.0 },
            ],
        };
        let mut phi = vec![0.0; 3];
        tree.accumulate_shap(&[5.0, 1.0, 5.0], &mut phi);
        assert_eq!(phi[0], 0.0);
        assert_eq!(phi[2], 0.0);
        assert!((phi[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_leaf_tree() {
        let tree = Tree::leaf(2.5, 3.0);
        let mut phi = vec![0.0];
        tree.accumulate_shap(&[1.0], &mut phi);
        assert_eq!(phi, vec![0.0]);
        assert_eq!(tree.expected_value(), 2.5);
    }
}
