//! Inference with a promoted model.

use std::path::Path;

use estate_processing::dataset::read_dataset;
use estate_processing::{ArtifactPaths, EncodingPipeline, FittedPipelineState, PipelineConfig};
use tracing::info;

use crate::booster::BoosterFamily;
use crate::config::TrainerConfig;
use crate::error::{LearningError, Result};
use crate::matrix::frame_to_matrix;
use crate::store::{FsModelStore, ModelStore};

/// Predicts sale prices for new rows with the persisted pipeline state and
/// a family's best model.
pub struct Predictor {
    processing: PipelineConfig,
    paths: ArtifactPaths,
    store: Box<dyn ModelStore + Send + Sync>,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("processing", &self.processing)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl Predictor {
    /// Predictor reading artifacts from `config.artifact_root`.
    pub fn new(config: &TrainerConfig) -> Self {
        let paths = config.artifact_paths();
        Self {
            processing: config.processing.clone(),
            store: Box::new(FsModelStore::new(paths.models.clone())),
            paths,
        }
    }

    /// Predict one value per row of the file at `input_path`, in row order.
    ///
    /// Fails with [`LearningError::ArtifactNotFound`] before touching the
    /// input when `family` has no promoted model.
    pub fn predict(&self, family: BoosterFamily, input_path: &Path) -> Result<Vec<f64>> {
        if !self.store.has_best(family) {
            return Err(LearningError::ArtifactNotFound {
                family: family.to_string(),
                path: self.paths.models.join(family.as_str()).display().to_string(),
            });
        }

        let state = FittedPipelineState::load(&self.paths)?;
        let raw = read_dataset(input_path)?;
        let encoded = EncodingPipeline::new(self.processing.clone()).transform(raw, &state)?;
        let x = frame_to_matrix(&encoded)?;

        let model = self.store.load_best(family)?;
        let predictions = model.predict(&x)?;
        info!(
            "Predicted {} rows of {} with {}",
            predictions.len(),
            input_path.display(),
            family
        );
        Ok(predictions)
    }
}
