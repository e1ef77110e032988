//! Versioned artifact directory
//!
//! Training writes one JSON file per frozen component plus a manifest; serving
//! loads exactly those files back. Every file carries the schema version of the
//! crate that wrote it and a mismatch is a load error.

use crate::error::{ChurnError, Result};
use crate::preprocessing::{
    ChurnPreprocessor, EncoderState, FeatureLayout, Imputer, PreprocessingConfig, ScalerState,
};
use crate::training::{ClassificationReport, ModelMetrics, SplitSizes, TrainedModel, TrainingOutcome};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Layout version of every artifact file
pub const SCHEMA_VERSION: u32 = 1;

pub const ENCODERS_FILE: &str = "encoders.json";
pub const IMPUTERS_FILE: &str = "imputers.json";
pub const SCALERS_FILE: &str = "scalers.json";
pub const LAYOUT_FILE: &str = "layout.json";
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifact payload tagged with the schema version it was written with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub schema_version: u32,
    pub data: T,
}

#[derive(Deserialize)]
struct VersionProbe {
    schema_version: u32,
}

/// Declared feature order with the configuration that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutArtifact {
    pub config: PreprocessingConfig,
    pub layout: FeatureLayout,
}

/// Summary of a training run stored next to the artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: DateTime<Utc>,
    pub crate_version: String,
    pub feature_names: Vec<String>,
    pub metrics: ModelMetrics,
    pub report: ClassificationReport,
    pub sizes: SplitSizes,
    pub files: Vec<String>,
}

/// Directory holding one training run's artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every frozen component and the manifest
    pub fn save(&self, outcome: &TrainingOutcome) -> Result<Manifest> {
        fs::create_dir_all(&self.root).map_err(|e| {
            ChurnError::ArtifactError(format!("cannot create {}: {}", self.root.display(), e))
        })?;

        let preprocessor = &outcome.preprocessor;
        let missing = || ChurnError::ArtifactError("preprocessor is not fitted".to_string());
        let layout = preprocessor.layout().ok_or_else(missing)?;
        let encoders = preprocessor.encoders().ok_or_else(missing)?;
        let imputer = preprocessor.imputer().ok_or_else(missing)?;
        let scalers = preprocessor.scalers().ok_or_else(missing)?;

        self.write(ENCODERS_FILE, encoders)?;
        self.write(IMPUTERS_FILE, imputer)?;
        self.write(SCALERS_FILE, scalers)?;
        self.write(
            LAYOUT_FILE,
            &LayoutArtifact {
                config: preprocessor.config().clone(),
                layout: layout.clone(),
            },
        )?;
        self.write(MODEL_FILE, &outcome.model)?;

        let manifest = Manifest {
            created_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            feature_names: outcome.model.feature_names().to_vec(),
            metrics: outcome.metrics.clone(),
            report: outcome.report.clone(),
            sizes: outcome.sizes,
            files: [ENCODERS_FILE, IMPUTERS_FILE, SCALERS_FILE, LAYOUT_FILE, MODEL_FILE]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        };
        self.write(MANIFEST_FILE, &manifest)?;

        info!(dir = %self.root.display(), features = manifest.feature_names.len(), "Saved artifacts");
        Ok(manifest)
    }

    /// Rebuild the frozen preprocessor
    pub fn load_preprocessor(&self) -> Result<ChurnPreprocessor> {
        let encoders: EncoderState = self.read(ENCODERS_FILE)?;
        let imputer: Imputer = self.read(IMPUTERS_FILE)?;
        let scalers: ScalerState = self.read(SCALERS_FILE)?;
        let LayoutArtifact { config, layout } = self.read(LAYOUT_FILE)?;
        ChurnPreprocessor::from_frozen(config, layout, encoders, imputer, scalers)
    }

    /// Load the trained classifier
    pub fn load_model(&self) -> Result<TrainedModel> {
        let model: TrainedModel = self.read(MODEL_FILE)?;
        if !model.classifier().is_fitted() {
            return Err(ChurnError::ArtifactError(format!(
                "{} holds an unfitted classifier",
                MODEL_FILE
            )));
        }
        Ok(model)
    }

    pub fn load_manifest(&self) -> Result<Manifest> {
        self.read(MANIFEST_FILE)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.path(name);
        let file = File::create(&path).map_err(|e| {
            ChurnError::ArtifactError(format!("cannot create {}: {}", path.display(), e))
        })?;
        let versioned = Versioned {
            schema_version: SCHEMA_VERSION,
            data,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &versioned).map_err(|e| {
            ChurnError::SerializationError(format!("cannot write {}: {}", path.display(), e))
        })?;
        debug!(file = name, "Wrote artifact");
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        let file = File::open(&path).map_err(|e| {
            ChurnError::ArtifactError(format!("cannot open {}: {}", path.display(), e))
        })?;
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ChurnError::ArtifactError(format!("{} is corrupt: {}", name, e)))?;

        let probe = VersionProbe::deserialize(&value).map_err(|e| {
            ChurnError::ArtifactError(format!("{} has no schema version: {}", name, e))
        })?;
        if probe.schema_version != SCHEMA_VERSION {
            return Err(ChurnError::ArtifactError(format!(
                "{} has schema version {}, expected {}",
                name, probe.schema_version, SCHEMA_VERSION
            )));
        }

        let versioned: Versioned<T> = serde_json::from_value(value)
            .map_err(|e| ChurnError::ArtifactError(format!("{} is corrupt: {}", name, e)))?;
        Ok(versioned.data)
    }
}
