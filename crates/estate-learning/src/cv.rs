//! K-fold cross-validation splits.

use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LearningError, Result};

/// One train/test partition of the row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvSplit {
    /// Zero-based fold number.
    pub fold: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl CvSplit {
    /// Rows of `x` and `y` belonging to this split, as
    /// `(train_x, train_y, test_x, test_y)`.
    pub fn take(&self, x: &Array2<f64>, y: &[f64]) -> (Array2<f64>, Vec<f64>, Array2<f64>, Vec<f64>) {
        let pick = |idx: &[usize]| idx.iter().map(|&i| y[i]).collect::<Vec<_>>();
        (
            x.select(Axis(0), &self.train),
            pick(&self.train),
            x.select(Axis(0), &self.test),
            pick(&self.test),
        )
    }
}

/// K-fold splitter. Without shuffling folds are contiguous blocks of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
    shuffle_seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle_seed: None,
        }
    }

    /// Shuffle row order with a seeded generator before cutting folds.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Splits for `n_samples` rows. The first `n_samples % k` folds hold one
    /// extra test row.
    pub fn split(&self, n_samples: usize) -> Result<Vec<CvSplit>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(LearningError::InvalidConfig(format!(
                "Number of folds must be at least 2, got {k}"
            )));
        }
        if n_samples < k {
            return Err(LearningError::InvalidData(format!(
                "Cannot split {n_samples} rows into {k} folds"
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / k;
        let remainder = n_samples % k;
        let mut splits = Vec::with_capacity(k);
        let mut start = 0;

        for fold in 0..k {
            let size = if fold < remainder { base + 1 } else { base };
            let end = start + size;
            let test = indices[start..end].to_vec();
            let train = indices[..start]
                .iter()
                .chain(&indices[end..])
                .copied()
                .collect();
            splits.push(CvSplit { fold, train, test });
            start = end;
        }

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_every_row_tested_once() {
        let splits = KFold::new(5).with_shuffle(33).split(23).unwrap();
        assert_eq!(splits.len(), 5);

        let mut seen = vec![0; 23];
        for split in &splits {
            assert_eq!(split.train.len() + split.test.len(), 23);
            for &i in &split.test {
                seen[i] += 1;
                assert!(!split.train.contains(&i));
            }
        }
        assert!(seen.iter().all(|&c| c == 1));

        let sizes: Vec<usize> = splits.iter().map(|s| s.test.len()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let a = KFold::new(3).with_shuffle(33).split(12).unwrap();
        let b = KFold::new(3).with_shuffle(33).split(12).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unshuffled_folds_are_contiguous() {
        let splits = KFold::new(2).split(4).unwrap();
        assert_eq!(splits[0].test, vec![0, 1]);
        assert_eq!(splits[1].test, vec![2, 3]);
    }

    #[test]
    fn test_invalid_fold_counts() {
        assert!(KFold::new(1).split(10).is_err());
        assert!(KFold::new(5).split(4).is_err());
    }

    #[test]
    fn test_take_selects_rows() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = [10.0, 20.0, 30.0, 40.0];
        let split = &KFold::new(2).split(4).unwrap()[1];
        let (train_x, train_y, test_x, test_y) = split.take(&x, &y);
        assert_eq!(train_x, array![[1.0], [2.0]]);
        assert_eq!(train_y, vec![10.0, 20.0]);
        assert_eq!(test_x, array![[3.0], [4.0]]);
        assert_eq!(test_y, vec![30.0, 40.0]);
    }
}
