//! Strategies for proposing the next trial.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::search_space::{SearchSpace, TrialParams};

/// Which sampler drives the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    Random,
    /// Tree-structured Parzen estimator; random until enough history exists.
    #[default]
    Tpe,
}

/// Proposes hyperparameters given the completed trials so far.
pub trait Sampler: Send {
    /// `history` holds `(params, objective)` for finished trials; failed
    /// trials carry `f64::INFINITY`.
    fn sample(&mut self, space: &SearchSpace, history: &[(TrialParams, f64)]) -> TrialParams;
}

pub fn create_sampler(kind: SamplerKind, seed: u64) -> Box<dyn Sampler> {
    match kind {
        SamplerKind::Random => Box::new(RandomSampler::new(seed)),
        SamplerKind::Tpe => Box::new(TpeSampler::new(seed)),
    }
}

#[derive(Debug)]
pub struct RandomSampler {
    rng: Xoshiro256PlusPlus,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, space: &SearchSpace, _history: &[(TrialParams, f64)]) -> TrialParams {
        space.sample(&mut self.rng)
    }
}

/// Simplified TPE: draw candidates at random and keep the one closest to
/// the best `gamma` fraction of past trials.
#[derive(Debug)]
pub struct TpeSampler {
    rng: Xoshiro256PlusPlus,
    n_startup_trials: usize,
    gamma: f64,
    n_candidates: usize,
}

impl TpeSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            n_startup_trials: 10,
            gamma: 0.25,
            n_candidates: 24,
        }
    }

    #[cfg(test)]
    fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Mean inverse distance to the good trials, each parameter scaled to
    /// its domain.
    fn similarity(space: &SearchSpace, candidate: &TrialParams, good: &[&TrialParams]) -> f64 {
        if good.is_empty() {
            return 0.0;
        }
        let mut total = 0.0;
        for trial in good {
            let mut dist = 0.0;
            let mut count = 0;
            for (name, value) in candidate {
                let (Some(spec), Some(other)) = (space.get(name), trial.get(name)) else {
                    continue;
                };
                let d = spec.normalize(value) - spec.normalize(other);
                dist += d * d;
                count += 1;
            }
            if count > 0 {
                total += 1.0 / (1.0 + (dist / count as f64).sqrt());
            }
        }
        total / good.len() as f64
    }
}

impl Sampler for TpeSampler {
    fn sample(&mut self, space: &SearchSpace, history: &[(TrialParams, f64)]) -> TrialParams {
        let finished: Vec<&(TrialParams, f64)> =
            history.iter().filter(|(_, v)| v.is_finite()).collect();
        if finished.len() < self.n_startup_trials {
            return space.sample(&mut self.rng);
        }

        let mut sorted = finished;
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
        let n_good = ((sorted.len() as f64 * self.gamma).ceil() as usize).max(1);
        let good: Vec<&TrialParams> = sorted[..n_good].iter().map(|(p, _)| p).collect();

        let mut best = space.sample(&mut self.rng);
        let mut best_score = Self::similarity(space, &best, &good);
        for _ in 1..self.n_candidates {
            let candidate = space.sample(&mut self.rng);
            let score = Self::similarity(space, &candidate, &good);
            if score > best_score {
                best_score = score;
                best = candidate;
            }
        }
        best
    }
}
