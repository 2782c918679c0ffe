//! The fitted pipeline state and its on-disk form.
//!
//! [`FittedPipelineState`] is produced once by the fit path and handed,
//! read-only, to the transform path. On disk it is split into one binary
//! artifact per concern so each piece can be inspected or replaced on its
//! own; [`FittedPipelineState::save`] and [`FittedPipelineState::load`] are
//! the only code that knows the layout.

use crate::config::ArtifactPaths;
use crate::encoding::{OneHotEncoder, OrdinalEncoder};
use crate::error::{ProcessingError, Result, ResultExt};
use crate::missing::MissingValueState;
use crate::roles::ColumnRoles;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Encoders fitted on the training partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoders {
    /// Data-dependent missing-value fills.
    pub missing_values: MissingValueState,
    /// Training median per numeric-with-missing column.
    pub medians: BTreeMap<String, f64>,
    pub ordinal: OrdinalEncoder,
    pub one_hot: OneHotEncoder,
}

/// Everything the transform path needs to replay preprocessing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedPipelineState {
    pub roles: ColumnRoles,
    pub encoders: FittedEncoders,
    /// Model input columns, in model order.
    pub selected_features: Vec<String>,
}

impl FittedPipelineState {
    /// Write every artifact, creating the root directory if needed.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        fs::create_dir_all(&paths.root)?;
        write_artifact(&paths.column_roles, &self.roles)?;
        write_artifact(&paths.missing_values, &self.encoders.missing_values)?;
        write_artifact(&paths.medians, &self.encoders.medians)?;
        write_artifact(&paths.ordinal, &self.encoders.ordinal)?;
        write_artifact(&paths.one_hot, &self.encoders.one_hot)?;
        write_artifact(&paths.selected_features, &self.selected_features)?;
        debug!("Saved pipeline state under {}", paths.root.display());
        Ok(())
    }

    /// Read every artifact. A missing file is reported as
    /// [`ProcessingError::ArtifactMissing`].
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        Ok(Self {
            roles: read_artifact(&paths.column_roles)?,
            encoders: FittedEncoders {
                missing_values: read_artifact(&paths.missing_values)?,
                medians: read_artifact(&paths.medians)?,
                ordinal: read_artifact(&paths.ordinal)?,
                one_hot: read_artifact(&paths.one_hot)?,
            },
            selected_features: read_artifact(&paths.selected_features)?,
        })
    }

    /// Whether all artifacts exist under `paths`.
    pub fn exists(paths: &ArtifactPaths) -> bool {
        [
            &paths.column_roles,
            &paths.missing_values,
            &paths.medians,
            &paths.ordinal,
            &paths.one_hot,
            &paths.selected_features,
        ]
        .iter()
        .all(|p| p.exists())
    }
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    fs::write(path, bytes).map_err(ProcessingError::from)
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(ProcessingError::ArtifactMissing(path.display().to_string()));
    }
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes)
        .map_err(ProcessingError::from)
        .context(format!("Failed to decode {}", path.display()))
}
