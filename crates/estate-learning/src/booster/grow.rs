//! Tree growth policies.
//!
//! All three growers share the histogram split search in this module and
//! differ only in the order nodes are expanded:
//!
//! - [`grow_depthwise`]: level by level down to `max_depth`
//! - [`grow_leafwise`]: best gain first until `num_leaves` leaves exist
//! - [`grow_symmetric`]: one shared split per level (oblivious trees)

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::binning::BinnedMatrix;
use super::tree::{Node, Tree};
use super::BoosterParams;

/// Everything a grower needs for one boosting round.
pub(crate) struct GrowContext<'a> {
    pub bins: &'a BinnedMatrix,
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    pub params: &'a BoosterParams,
    /// Candidate features per depth; the last entry is reused past its end.
    pub level_features: &'a [Vec<usize>],
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    grad: f64,
    hess: f64,
    count: usize,
}

impl BinStats {
    fn add(&mut self, other: &BinStats) {
        self.grad += other.grad;
        self.hess += other.hess;
        self.count += other.count;
    }

    fn sub(&self, other: &BinStats) -> BinStats {
        BinStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    /// Index into the feature's cuts; codes `<= cut + 1` go left.
    cut: usize,
    threshold: f64,
    gain: f64,
}

impl<'a> GrowContext<'a> {
    fn level(&self, depth: usize) -> &'a [usize] {
        let levels = self.level_features;
        match levels.get(depth).or_else(|| levels.last()) {
            Some(features) => features.as_slice(),
            None => &[],
        }
    }

    fn totals(&self, rows: &[usize]) -> BinStats {
        let mut stats = BinStats::default();
        for &r in rows {
            stats.grad += self.grad[r];
            stats.hess += self.hess[r];
            stats.count += 1;
        }
        stats
    }

    fn histogram(&self, rows: &[usize], feature: usize) -> Vec<BinStats> {
        let mut hist = vec![BinStats::default(); self.bins.n_bins(feature)];
        let codes = &self.bins.codes[feature];
        for &r in rows {
            let bin = &mut hist[codes[r] as usize];
            bin.grad += self.grad[r];
            bin.hess += self.hess[r];
            bin.count += 1;
        }
        hist
    }

    /// Output of a leaf holding `stats`, learning rate applied.
    fn leaf_value(&self, stats: &BinStats) -> f64 {
        let denom = stats.hess + self.params.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -stats.grad / denom * self.params.learning_rate
    }

    fn leaf(&self, stats: &BinStats) -> Node {
        Node::Leaf {
            value: self.leaf_value(stats),
            cover: stats.hess,
        }
    }

    /// Call `visit(cut, gain)` for every admissible split of one feature.
    fn scan(&self, hist: &[BinStats], total: &BinStats, mut visit: impl FnMut(usize, f64)) {
        let p = self.params;
        let min_count = p.min_child_samples.max(1);
        let parent_score = score(total, p.reg_lambda);

        let mut left = hist[0];
        // The last code has no cut above it, so cuts are `0..n_bins - 2`.
        for cut in 0..hist.len().saturating_sub(2) {
            left.add(&hist[cut + 1]);
            let right = total.sub(&left);
            if left.count < min_count || right.count < min_count {
                continue;
            }
            if left.hess < p.min_child_weight || right.hess < p.min_child_weight {
                continue;
            }
            let gain = 0.5 * (score(&left, p.reg_lambda) + score(&right, p.reg_lambda) - parent_score)
                - p.gamma;
            visit(cut, gain);
        }
    }

    fn best_split(&self, rows: &[usize], total: &BinStats, depth: usize) -> Option<SplitCandidate> {
        if rows.len() < 2 {
            return None;
        }
        let mut best: Option<SplitCandidate> = None;
        for &feature in self.level(depth) {
            let hist = self.histogram(rows, feature);
            self.scan(&hist, total, |cut, gain| {
                if gain > 0.0 && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        cut,
                        threshold: self.bins.cuts[feature][cut],
                        gain,
                    });
                }
            });
        }
        best
    }

    fn partition(&self, rows: &[usize], feature: usize, cut: usize) -> (Vec<usize>, Vec<usize>) {
        let codes = &self.bins.codes[feature];
        let limit = cut + 1;
        rows.iter().partition(|&&r| codes[r] as usize <= limit)
    }

    fn depth_allows(&self, depth: usize) -> bool {
        self.params.max_depth == 0 || depth < self.params.max_depth
    }
}

fn score(stats: &BinStats, lambda: f64) -> f64 {
    let denom = stats.hess + lambda;
    if denom <= 0.0 {
        0.0
    } else {
        stats.grad * stats.grad / denom
    }
}

// ============================================================================
// Depth-wise
// ============================================================================

pub(crate) fn grow_depthwise(ctx: &GrowContext<'_>, rows: &[usize]) -> Tree {
    let mut nodes = Vec::new();
    build_depthwise(ctx, rows, 0, &mut nodes);
    Tree { nodes }
}

fn build_depthwise(ctx: &GrowContext<'_>, rows: &[usize], depth: usize, nodes: &mut Vec<Node>) -> usize {
    let total = ctx.totals(rows);
    let idx = nodes.len();
    nodes.push(ctx.leaf(&total));

    if !ctx.depth_allows(depth) {
        return idx;
    }
    let Some(split) = ctx.best_split(rows, &total, depth) else {
        return idx;
    };

    let (left_rows, right_rows) = ctx.partition(rows, split.feature, split.cut);
    let left = build_depthwise(ctx, &left_rows, depth + 1, nodes);
    let right = build_depthwise(ctx, &right_rows, depth + 1, nodes);
    nodes[idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        cover: total.hess,
    };
    idx
}

// ============================================================================
// Leaf-wise
// ============================================================================

struct Pending {
    rows: Vec<usize>,
    total: BinStats,
    depth: usize,
    split: SplitCandidate,
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    gain: f64,
    node: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Highest gain first, then the earliest node.
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.node.cmp(&self.node))
    }
}

pub(crate) fn grow_leafwise(ctx: &GrowContext<'_>, rows: &[usize]) -> Tree {
    let max_leaves = ctx.params.num_leaves.max(2);
    let mut nodes = Vec::new();
    let mut pending: Vec<Option<Pending>> = Vec::new();
    let mut queue = BinaryHeap::new();

    let push_leaf = |nodes: &mut Vec<Node>,
                         pending: &mut Vec<Option<Pending>>,
                         queue: &mut BinaryHeap<QueueEntry>,
                         rows: Vec<usize>,
                         depth: usize| {
        let total = ctx.totals(&rows);
        let node = nodes.len();
        nodes.push(ctx.leaf(&total));
        let split = if ctx.depth_allows(depth) {
            ctx.best_split(&rows, &total, depth)
        } else {
            None
        };
        match split {
            Some(split) => {
                queue.push(QueueEntry { gain: split.gain, node });
                pending.push(Some(Pending { rows, total, depth, split }));
            }
            None => pending.push(None),
        }
    };

    push_leaf(&mut nodes, &mut pending, &mut queue, rows.to_vec(), 0);
    let mut leaves = 1;

    while leaves < max_leaves {
        let Some(entry) = queue.pop() else { break };
        let Some(task) = pending[entry.node].take() else { continue };

        let (left_rows, right_rows) = ctx.partition(&task.rows, task.split.feature, task.split.cut);
        let left = nodes.len();
        push_leaf(&mut nodes, &mut pending, &mut queue, left_rows, task.depth + 1);
        let right = nodes.len();
        push_leaf(&mut nodes, &mut pending, &mut queue, right_rows, task.depth + 1);

        nodes[entry.node] = Node::Split {
            feature: task.split.feature,
            threshold: task.split.threshold,
            left,
            right,
            cover: task.total.hess,
        };
        leaves += 1;
    }

    Tree { nodes }
}

// ============================================================================
// Symmetric
// ============================================================================

/// Depth used by the symmetric grower when `max_depth` is unlimited.
const SYMMETRIC_DEFAULT_DEPTH: usize = 6;

pub(crate) fn grow_symmetric(ctx: &GrowContext<'_>, rows: &[usize]) -> Tree {
    let depth = match ctx.params.max_depth {
        0 => SYMMETRIC_DEFAULT_DEPTH,
        d => d,
    };

    let mut buckets: Vec<Vec<usize>> = vec![rows.to_vec()];
    let mut levels: Vec<SplitCandidate> = Vec::new();

    for level in 0..depth {
        let Some(split) = best_symmetric_split(ctx, &buckets, level) else {
            break;
        };
        buckets = buckets
            .iter()
            .flat_map(|bucket| {
                let (l, r) = ctx.partition(bucket, split.feature, split.cut);
                [l, r]
            })
            .filter(|bucket| !bucket.is_empty())
            .collect();
        levels.push(split);
    }

    let mut nodes = Vec::new();
    expand_symmetric(ctx, rows, &levels, 0, &mut nodes);
    Tree { nodes }
}

/// The (feature, cut) whose gain summed over every bucket is largest.
fn best_symmetric_split(
    ctx: &GrowContext<'_>,
    buckets: &[Vec<usize>],
    level: usize,
) -> Option<SplitCandidate> {
    let totals: Vec<BinStats> = buckets.iter().map(|b| ctx.totals(b)).collect();
    let mut best: Option<SplitCandidate> = None;

    for &feature in ctx.level(level) {
        let n_cuts = ctx.bins.cuts[feature].len();
        if n_cuts == 0 {
            continue;
        }
        let mut summed = vec![0.0; n_cuts];
        for (bucket, total) in buckets.iter().zip(&totals) {
            let hist = ctx.histogram(bucket, feature);
            ctx.scan(&hist, total, |cut, gain| summed[cut] += gain);
        }
        for (cut, &gain) in summed.iter().enumerate() {
            if gain > 0.0 && best.is_none_or(|b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    cut,
                    threshold: ctx.bins.cuts[feature][cut],
                    gain,
                });
            }
        }
    }
    best
}

fn expand_symmetric(
    ctx: &GrowContext<'_>,
    rows: &[usize],
    levels: &[SplitCandidate],
    level: usize,
    nodes: &mut Vec<Node>,
) -> usize {
    let total = ctx.totals(rows);
    let Some(split) = levels.get(level) else {
        nodes.push(ctx.leaf(&total));
        return nodes.len() - 1;
    };

    let (left_rows, right_rows) = ctx.partition(rows, split.feature, split.cut);
    if left_rows.is_empty() || right_rows.is_empty() {
        return expand_symmetric(ctx, rows, levels, level + 1, nodes);
    }

    let idx = nodes.len();
    nodes.push(ctx.leaf(&total));
    let left = expand_symmetric(ctx, &left_rows, levels, level + 1, nodes);
    let right = expand_symmetric(ctx, &right_rows, levels, level + 1, nodes);
    nodes[idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        cover: total.hess,
    };
    idx
}
