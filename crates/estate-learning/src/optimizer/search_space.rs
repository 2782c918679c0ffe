//! Stepped search spaces over booster hyperparameters.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::booster::BoosterFamily;

/// A sampled hyperparameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One trial's hyperparameters, ordered by name.
pub type TrialParams = BTreeMap<String, ParamValue>;

/// Domain of one hyperparameter: `low, low + step, ...` up to `high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamSpec {
    Float { low: f64, high: f64, step: f64 },
    Int { low: i64, high: i64, step: i64 },
    /// Always the same value.
    Fixed(ParamValue),
}

impl ParamSpec {
    /// Number of grid points.
    pub fn len(&self) -> usize {
        match self {
            ParamSpec::Float { low, high, step } => ((high - low) / step + 1e-9).floor() as usize + 1,
            ParamSpec::Int { low, high, step } => ((high - low) / step) as usize + 1,
            ParamSpec::Fixed(_) => 1,
        }
    }

    /// The `k`-th grid point.
    pub fn value_at(&self, k: usize) -> ParamValue {
        match self {
            ParamSpec::Float { low, step, .. } => {
                // Round away float noise from repeated steps.
                let v = low + k as f64 * step;
                ParamValue::Float((v * 1e9).round() / 1e9)
            }
            ParamSpec::Int { low, step, .. } => ParamValue::Int(low + k as i64 * step),
            ParamSpec::Fixed(v) => *v,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        let k = rng.gen_range(0..self.len());
        self.value_at(k)
    }

    /// Position of `value` within the domain, scaled to `[0, 1]`.
    pub fn normalize(&self, value: &ParamValue) -> f64 {
        let (low, high) = match self {
            ParamSpec::Float { low, high, .. } => (*low, *high),
            ParamSpec::Int { low, high, .. } => (*low as f64, *high as f64),
            ParamSpec::Fixed(_) => return 0.0,
        };
        if high <= low {
            0.0
        } else {
            (value.as_f64() - low) / (high - low)
        }
    }
}

/// Named parameter domains searched together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    params: BTreeMap<String, ParamSpec>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn float(mut self, name: &str, low: f64, high: f64, step: f64) -> Self {
        self.params
            .insert(name.to_string(), ParamSpec::Float { low, high, step });
        self
    }

    pub fn int(mut self, name: &str, low: i64, high: i64, step: i64) -> Self {
        self.params
            .insert(name.to_string(), ParamSpec::Int { low, high, step });
        self
    }

    pub fn fixed(mut self, name: &str, value: ParamValue) -> Self {
        self.params.insert(name.to_string(), ParamSpec::Fixed(value));
        self
    }

    /// Search space used for `family`.
    pub fn for_family(family: BoosterFamily) -> Self {
        let shared = Self::new()
            .float("learning_rate", 0.0005, 0.5, 0.01)
            .int("n_estimators", 0, 3000, 10)
            .int("max_bin", 16, 2048, 16)
            .float("subsample", 0.1, 1.0, 0.1);

        match family {
            BoosterFamily::CatBoostRegressor => shared
                .float("colsample_bylevel", 0.1, 1.0, 0.1)
                .int("max_depth", 6, 10, 1)
                .fixed("random_seed", ParamValue::Int(33)),
            BoosterFamily::XGBRegressor => shared
                .float("colsample_bylevel", 0.1, 1.0, 0.1)
                .int("max_depth", 1, 16, 1),
            BoosterFamily::LGBMRegressor => shared.float("colsample_bytree", 0.1, 1.0, 0.1),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TrialParams {
        self.params
            .iter()
            .map(|(name, spec)| (name.clone(), spec.sample(rng)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_grid_sizes() {
        let lr = ParamSpec::Float { low: 0.0005, high: 0.5, step: 0.01 };
        assert_eq!(lr.len(), 50);
        assert_eq!(lr.value_at(0), ParamValue::Float(0.0005));
        assert_eq!(lr.value_at(49), ParamValue::Float(0.4905));

        let trees = ParamSpec::Int { low: 0, high: 3000, step: 10 };
        assert_eq!(trees.len(), 301);
        assert_eq!(trees.value_at(300), ParamValue::Int(3000));

        let ratio = ParamSpec::Float { low: 0.1, high: 1.0, step: 0.1 };
        assert_eq!(ratio.len(), 10);
        assert_eq!(ratio.value_at(9), ParamValue::Float(1.0));
    }

    #[test]
    fn test_family_spaces() {
        let cat = SearchSpace::for_family(BoosterFamily::CatBoostRegressor);
        assert_eq!(cat.get("random_seed"), Some(&ParamSpec::Fixed(ParamValue::Int(33))));
        assert!(cat.get("colsample_bylevel").is_some());

        let lgbm = SearchSpace::for_family(BoosterFamily::LGBMRegressor);
        assert!(lgbm.get("colsample_bytree").is_some());
        assert!(lgbm.get("max_depth").is_none());

        let xgb = SearchSpace::for_family(BoosterFamily::XGBRegressor);
        assert_eq!(xgb.get("max_depth"), Some(&ParamSpec::Int { low: 1, high: 16, step: 1 }));
    }

    #[test]
    fn test_samples_stay_on_grid() {
        let space = SearchSpace::for_family(BoosterFamily::XGBRegressor);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..100 {
            let params = space.sample(&mut rng);
            assert_eq!(params.len(), space.len());
            let depth = params["max_depth"].as_f64();
            assert!((1.0..=16.0).contains(&depth));
            let bins = params["max_bin"].as_f64() as i64;
            assert_eq!((bins - 16) % 16, 0);
            let sub = params["subsample"].as_f64();
            assert!(sub > 0.0 && sub <= 1.0);
        }
    }

    #[test]
    fn test_param_values_serialize_plainly() {
        let mut params = TrialParams::new();
        params.insert("learning_rate".into(), ParamValue::Float(0.1));
        params.insert("max_depth".into(), ParamValue::Int(6));
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"learning_rate":0.1,"max_depth":6}"#);
        let back: TrialParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
