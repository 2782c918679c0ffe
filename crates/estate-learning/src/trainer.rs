//! End-to-end training of one model family.
//!
//! [`Trainer::train`] runs three phases and reports each through `tracing`
//! and the optional progress callback:
//!
//! 1. **Dataset build**: read the file, classify columns, split 80/20, fit
//!    the encoding pipeline, rank features on the hold-out rows and persist
//!    the fitted state.
//! 2. **Hyperparameter search**: k-fold search over the family's space on
//!    the training split.
//! 3. **Final evaluation**: refit every fold of the pooled rows with the best
//!    parameters and early stopping, store each fold model and promote the
//!    lowest-RMSE fold.
//!
//! A failure in any phase aborts the run before promotion, so the
//! previously promoted model (if any) stays in place.
//!
//! # Example
//!
//! ```rust,ignore
//! use estate_learning::{BoosterFamily, Trainer, TrainerConfig};
//!
//! let mut trainer = Trainer::builder()
//!     .config(TrainerConfig::default())
//!     .on_progress(|u| println!("{}", u.message))
//!     .build()?;
//! let outcome = trainer.train(BoosterFamily::XGBRegressor, "train.csv".as_ref())?;
//! println!("best fold {} rmse {:.2}", outcome.best_fold_no, outcome.folds[outcome.best_fold_no].rmse);
//! ```

use std::path::Path;

use estate_processing::dataset::{drop_identifier, read_dataset, split_target, train_test_split, write_csv};
use estate_processing::pipeline::select_features;
use estate_processing::utils::f64_series;
use estate_processing::{ColumnRoles, EncodingPipeline, FittedPipelineState, ProcessingError};
use ndarray::{concatenate, Array2, Axis};
use polars::prelude::DataFrame;
use tracing::{debug, error, info};

use crate::booster::{BoosterFamily, EvalSet, GradientBooster};
use crate::config::TrainerConfig;
use crate::cv::KFold;
use crate::error::{LearningError, Result};
use crate::matrix::frame_to_matrix;
use crate::metrics;
use crate::optimizer::{create_sampler, HyperparameterOptimizer, OptimizationOutcome, SearchSpace};
use crate::progress::{ProgressCallback, ProgressUpdate, TrainingStage};
use crate::selector::FeatureSelector;
use crate::store::{FsModelStore, ModelStore};
use crate::types::{best_fold_index, FoldResult, TrainingOutcome};

/// Encoded, feature-selected matrices produced by the dataset build.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub feature_names: Vec<String>,
    pub train_x: Array2<f64>,
    pub train_y: Vec<f64>,
    pub holdout_x: Array2<f64>,
    pub holdout_y: Vec<f64>,
}

/// Runs training for one family at a time.
pub struct Trainer {
    config: TrainerConfig,
    store: Box<dyn ModelStore + Send + Sync>,
    progress_callback: Option<ProgressCallback>,
    stage: TrainingStage,
    progress: f64,
}

static_assertions::assert_impl_all!(Trainer: Send);

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("stage", &self.stage)
            .finish()
    }
}

impl Trainer {
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Stage reached by the last (or current) run.
    pub fn stage(&self) -> TrainingStage {
        self.stage
    }

    /// Train `family` on the labelled file at `data_path`.
    pub fn train(&mut self, family: BoosterFamily, data_path: &Path) -> Result<TrainingOutcome> {
        self.stage = TrainingStage::DatasetBuild;
        self.progress = 0.0;
        match self.run(family, data_path) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Training {} failed: {}", family, e);
                self.advance(TrainingStage::Failed, format!("Training failed: {e}"));
                Err(e)
            }
        }
    }

    fn run(&mut self, family: BoosterFamily, data_path: &Path) -> Result<TrainingOutcome> {
        info!("Training {} on {}", family, data_path.display());
        self.report(0.0, "Building dataset", None);
        let (dataset, selected_features) = self.build_dataset(data_path)?;

        self.advance(TrainingStage::HyperparameterSearch, "Searching hyperparameters".to_string());
        let search = self.search(family, &dataset)?;

        self.advance(TrainingStage::FinalEvaluation, "Evaluating folds".to_string());
        let (folds, best_fold_no) = self.final_evaluation(family, &dataset, &search)?;

        self.advance(
            TrainingStage::Complete,
            format!("Promoted fold {best_fold_no} of {family}"),
        );
        Ok(TrainingOutcome {
            family,
            folds,
            best_fold_no,
            best_params: search.best_params,
            best_value: search.best_value,
            trials: search.trials,
            selected_features,
        })
    }

    /// Dataset build: encode, select features, persist the fitted state.
    pub fn build_dataset(&mut self, data_path: &Path) -> Result<(PreparedDataset, Vec<String>)> {
        let processing = self.config.processing.clone();
        let paths = self.config.artifact_paths();

        info!("Step 1: Reading {}", data_path.display());
        let raw = read_dataset(data_path)?;
        let raw = drop_identifier(raw, &processing.id_column)?;

        info!("Step 2: Classifying columns...");
        let roles = ColumnRoles::classify(&raw, &processing)?;
        debug!(
            "Roles: {} ordinal, {} categorical, {} numeric ({} with missing)",
            roles.ordinal.len(),
            roles.categorical.len(),
            roles.numeric.len(),
            roles.numeric_with_missing.len()
        );

        info!("Step 3: Splitting train/hold-out...");
        let (x, y) = split_target(raw, &processing.target_column)?;
        let split = train_test_split(&x, &y, processing.test_size, processing.random_seed)?;

        info!("Step 4: Fitting encoding pipeline...");
        let fitted = EncodingPipeline::new(processing.clone()).fit(
            split.train_x,
            split.holdout_x,
            &roles,
        )?;
        self.report(0.15, "Encoded training data", None);

        info!("Step 5: Ranking features...");
        let names = fitted.feature_names();
        let ranking = FeatureSelector::new(self.config.selector_config()).select(
            &names,
            &frame_to_matrix(&fitted.train)?,
            &split.train_y,
            &frame_to_matrix(&fitted.holdout)?,
        )?;
        let selected = ranking.selected;
        self.report(0.3, format!("Selected {} features", selected.len()), None);

        info!("Step 6: Persisting pipeline state...");
        let state = FittedPipelineState {
            roles,
            encoders: fitted.encoders,
            selected_features: selected.clone(),
        };
        state.save(&paths)?;

        let train_selected = select_features(&fitted.train, &selected)?;
        let holdout_selected = select_features(&fitted.holdout, &selected)?;
        let mut cleaned = with_target(&train_selected, &processing.target_column, &split.train_y)?;
        write_csv(&mut cleaned, &paths.cleaned_train)?;

        let dataset = PreparedDataset {
            feature_names: selected.clone(),
            train_x: frame_to_matrix(&train_selected)?,
            train_y: split.train_y,
            holdout_x: frame_to_matrix(&holdout_selected)?,
            holdout_y: split.holdout_y,
        };
        Ok((dataset, selected))
    }

    fn search(&mut self, family: BoosterFamily, dataset: &PreparedDataset) -> Result<OptimizationOutcome> {
        let folds = KFold::new(self.config.n_folds).with_shuffle(self.config.random_seed);
        let mut optimizer = HyperparameterOptimizer::new(
            SearchSpace::for_family(family),
            self.config.n_trials,
            create_sampler(self.config.sampler, self.config.random_seed),
        );
        let base = GradientBooster::new(family);
        let outcome = optimizer.optimize(&base, &dataset.train_x, &dataset.train_y, &folds)?;
        info!(
            "Best parameters (cv rmse {:.4}): {:?}",
            outcome.best_value, outcome.best_params
        );
        self.report(0.6, format!("Search finished: rmse {:.4}", outcome.best_value), None);
        Ok(outcome)
    }

    fn final_evaluation(
        &mut self,
        family: BoosterFamily,
        dataset: &PreparedDataset,
        search: &OptimizationOutcome,
    ) -> Result<(Vec<FoldResult>, usize)> {
        let mut model = GradientBooster::new(family);
        model.set_params(&search.best_params)?;

        let x = concatenate(Axis(0), &[dataset.train_x.view(), dataset.holdout_x.view()])
            .map_err(|e| LearningError::InvalidData(e.to_string()))?;
        let y: Vec<f64> = dataset
            .train_y
            .iter()
            .chain(&dataset.holdout_y)
            .copied()
            .collect();

        let splits = KFold::new(self.config.n_folds)
            .with_shuffle(self.config.random_seed)
            .split(x.nrows())?;
        let total = splits.len();
        let mut folds = Vec::with_capacity(total);

        for split in &splits {
            let (train_x, train_y, test_x, test_y) = split.take(&x, &y);
            let mut fold_model = model.clone();
            fold_model
                .fit_with_eval(
                    &train_x,
                    &train_y,
                    EvalSet { x: &test_x, y: &test_y },
                    self.config.early_stopping_rounds,
                )
                .map_err(|e| LearningError::TrainingFailed(format!("Fold {} failed: {e}", split.fold)))?;

            let predicted = fold_model.predict(&test_x)?;
            let scores = metrics::evaluate(&test_y, &predicted, train_x.nrows(), train_x.ncols());
            info!(
                "Fold {}: rmse {:.4}, mae {:.4}, r2 {:.4} ({} trees)",
                split.fold,
                scores.rmse,
                scores.mae,
                scores.r2,
                fold_model.n_trees()
            );
            self.store.put(family, split.fold, &fold_model)?;
            folds.push(FoldResult::new(split.fold, scores, test_y, predicted));

            let done = folds.len();
            self.report(
                0.6 + 0.35 * done as f64 / total as f64,
                format!("Fold {done}/{total} done"),
                Some((done as u32, total as u32)),
            );
        }

        let best = best_fold_index(&folds)
            .ok_or_else(|| LearningError::TrainingFailed("No folds were evaluated".to_string()))?;
        let best_fold_no = folds[best].fold_no;
        self.store.promote_best(family, best_fold_no)?;
        Ok((folds, best_fold_no))
    }

    fn advance(&mut self, next: TrainingStage, message: String) {
        if !self.stage.can_advance_to(next) {
            debug!("Ignoring stage change {:?} -> {:?}", self.stage, next);
            return;
        }
        info!("Stage: {} -> {}", self.stage.as_str(), next.as_str());
        self.stage = next;
        let progress = if next == TrainingStage::Complete { 1.0 } else { self.progress };
        self.report(progress, message, None);
    }

    fn report(&mut self, progress: f64, message: impl Into<String>, current_fold: Option<(u32, u32)>) {
        self.progress = self.progress.max(progress);
        if let Some(callback) = &self.progress_callback {
            callback(ProgressUpdate {
                stage: self.stage,
                progress: self.progress,
                message: message.into(),
                current_fold,
            });
        }
    }
}

/// `features` with the target appended as the last column.
fn with_target(features: &DataFrame, target: &str, y: &[f64]) -> Result<DataFrame> {
    let mut df = features.clone();
    df.with_column(f64_series(target, y.iter().copied().map(Some).collect()))
        .map_err(ProcessingError::from)?;
    Ok(df)
}

/// Builder for [`Trainer`].
#[derive(Default)]
pub struct TrainerBuilder {
    config: Option<TrainerConfig>,
    store: Option<Box<dyn ModelStore + Send + Sync>>,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for TrainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainerBuilder")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl TrainerBuilder {
    /// Set the configuration (required).
    #[must_use]
    pub fn config(mut self, config: TrainerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Store models somewhere other than `<artifact_root>/models`.
    #[must_use]
    pub fn store(mut self, store: impl ModelStore + Send + Sync + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<Trainer> {
        let config = self.config.ok_or_else(|| {
            LearningError::InvalidConfig("Trainer config is required".to_string())
        })?;
        config.validate()?;
        let store = match self.store {
            Some(store) => store,
            None => Box::new(FsModelStore::new(config.artifact_paths().models)),
        };
        Ok(Trainer {
            config,
            store,
            progress_callback: self.progress_callback,
            stage: TrainingStage::default(),
            progress: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_config() {
        let err = Trainer::builder().build().unwrap_err();
        assert!(matches!(err, LearningError::InvalidConfig(_)));
        assert!(err.to_string().contains("config is required"));
    }

    #[test]
    fn test_builder_validates_config() {
        let config = TrainerConfig {
            n_folds: 1,
            ..TrainerConfig::default()
        };
        assert!(Trainer::builder().config(config).build().is_err());
    }

    #[test]
    fn test_missing_file_fails_in_dataset_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig::builder()
            .artifact_root(dir.path())
            .build()
            .unwrap();
        let mut trainer = Trainer::builder().config(config).build().unwrap();
        let err = trainer
            .train(BoosterFamily::XGBRegressor, &dir.path().join("missing.csv"))
            .unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert_eq!(trainer.stage(), TrainingStage::Failed);
    }
}
