//! Model artifact storage.
//!
//! Layout under the models root:
//!
//! ```text
//! models/
//!   XGBRegressor/
//!     0.model
//!     1.model
//!     ...
//!     best_fold.model
//! ```
//!
//! Promotion copies a fold artifact next to the best pointer and renames it
//! into place, so a reader sees either the previous best model or the new
//! one, never a partial file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::booster::{BoosterFamily, GradientBooster};
use crate::error::{LearningError, Result};

/// File name of the promoted model.
pub const BEST_MODEL_FILE: &str = "best_fold.model";

/// Persistence for fold models and the promoted best model.
pub trait ModelStore {
    /// Store the model trained on `fold`, returning where it was written.
    fn put(&self, family: BoosterFamily, fold: usize, model: &GradientBooster) -> Result<PathBuf>;

    /// Make the model stored for `fold` the family's best model.
    fn promote_best(&self, family: BoosterFamily, fold: usize) -> Result<PathBuf>;

    /// Load the family's best model; [`LearningError::ArtifactNotFound`]
    /// when none was promoted.
    fn load_best(&self, family: BoosterFamily) -> Result<GradientBooster>;

    fn has_best(&self, family: BoosterFamily) -> bool;
}

impl GradientBooster {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// [`ModelStore`] backed by one directory per family.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    root: PathBuf,
}

impl FsModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn family_dir(&self, family: BoosterFamily) -> PathBuf {
        self.root.join(family.as_str())
    }

    pub fn fold_path(&self, family: BoosterFamily, fold: usize) -> PathBuf {
        self.family_dir(family).join(format!("{fold}.model"))
    }

    pub fn best_path(&self, family: BoosterFamily) -> PathBuf {
        self.family_dir(family).join(BEST_MODEL_FILE)
    }
}

impl ModelStore for FsModelStore {
    fn put(&self, family: BoosterFamily, fold: usize, model: &GradientBooster) -> Result<PathBuf> {
        fs::create_dir_all(self.family_dir(family))?;
        let path = self.fold_path(family, fold);
        fs::write(&path, model.to_bytes()?)?;
        debug!("Saved fold {} model to {}", fold, path.display());
        Ok(path)
    }

    fn promote_best(&self, family: BoosterFamily, fold: usize) -> Result<PathBuf> {
        let source = self.fold_path(family, fold);
        if !source.exists() {
            return Err(LearningError::ArtifactNotFound {
                family: family.to_string(),
                path: source.display().to_string(),
            });
        }
        let best = self.best_path(family);
        let staging = self.family_dir(family).join(format!(".{BEST_MODEL_FILE}.tmp"));
        fs::copy(&source, &staging)?;
        fs::rename(&staging, &best)?;
        info!("Promoted fold {} to {}", fold, best.display());
        Ok(best)
    }

    fn load_best(&self, family: BoosterFamily) -> Result<GradientBooster> {
        let path = self.best_path(family);
        if !path.exists() {
            return Err(LearningError::ArtifactNotFound {
                family: family.to_string(),
                path: path.display().to_string(),
            });
        }
        let model = GradientBooster::from_bytes(&fs::read(&path)?)?;
        if model.family() != family {
            return Err(LearningError::InvalidData(format!(
                "{} holds a {} model",
                path.display(),
                model.family()
            )));
        }
        Ok(model)
    }

    fn has_best(&self, family: BoosterFamily) -> bool {
        self.best_path(family).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::BoosterParams;
    use ndarray::Array2;

    fn fitted(family: BoosterFamily, shift: f64) -> GradientBooster {
        let x = Array2::from_shape_vec((6, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let y: Vec<f64> = (1..=6).map(|v| v as f64 + shift).collect();
        let params = BoosterParams {
            n_estimators: 3,
            min_child_samples: 1,
            ..BoosterParams::for_family(family)
        };
        let mut model = GradientBooster::with_params(family, params);
        model.fit(&x, &y).unwrap();
        model
    }

    #[test]
    fn test_missing_best_is_artifact_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path());
        assert!(!store.has_best(BoosterFamily::XGBRegressor));
        let err = store.load_best(BoosterFamily::XGBRegressor).unwrap_err();
        assert!(matches!(err, LearningError::ArtifactNotFound { ref family, .. } if family == "XGBRegressor"));
    }

    #[test]
    fn test_promotion_replaces_best() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path());
        let family = BoosterFamily::LGBMRegressor;

        let first = fitted(family, 0.0);
        let second = fitted(family, 100.0);
        store.put(family, 0, &first).unwrap();
        store.put(family, 1, &second).unwrap();

        store.promote_best(family, 0).unwrap();
        assert_eq!(store.load_best(family).unwrap(), first);

        store.promote_best(family, 1).unwrap();
        assert_eq!(store.load_best(family).unwrap(), second);

        let mut files: Vec<String> = fs::read_dir(store.family_dir(family))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["0.model", "1.model", "best_fold.model"]);
    }

    #[test]
    fn test_promoting_unknown_fold_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path());
        assert!(store.promote_best(BoosterFamily::CatBoostRegressor, 3).is_err());
        assert!(!store.has_best(BoosterFamily::CatBoostRegressor));
    }
}
