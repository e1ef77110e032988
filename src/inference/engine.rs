//! Inference engine implementation
//!
//! The engine owns the frozen preprocessor and classifier behind `Arc` and only
//! exposes `&self` methods, so one instance can serve concurrent callers.

use super::InferenceConfig;
use crate::data::RawRecord;
use crate::error::{ChurnError, Result};
use crate::export::ArtifactStore;
use crate::preprocessing::{ChurnPreprocessor, TransformOutput, UnknownCategoryHit};
use crate::training::TrainedModel;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    NotChurn,
    Churn,
}

impl Verdict {
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability >= threshold {
            Verdict::Churn
        } else {
            Verdict::NotChurn
        }
    }

    /// Numeric class, 1 for churn
    pub fn label(&self) -> u8 {
        match self {
            Verdict::NotChurn => 0,
            Verdict::Churn => 1,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::NotChurn => write!(f, "Not Churn"),
            Verdict::Churn => write!(f, "Churn"),
        }
    }
}

/// Scored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub verdict: Verdict,
    /// Churn probability
    pub probability: f64,
    /// Feature vector the classifier saw
    pub features: Vec<f64>,
    /// Categories encoded with the fallback
    pub flags: Vec<UnknownCategoryHit>,
}

/// Immutable serving context
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    config: InferenceConfig,
    preprocessor: Arc<ChurnPreprocessor>,
    model: Arc<TrainedModel>,
}

impl InferenceEngine {
    /// Build a context from in-memory parts.
    ///
    /// The model must have been trained on exactly the preprocessor's feature
    /// names, in the same order.
    pub fn new(
        config: InferenceConfig,
        preprocessor: ChurnPreprocessor,
        model: TrainedModel,
    ) -> Result<Self> {
        config.validate()?;
        let expected = preprocessor.feature_names()?;
        if expected != model.feature_names() {
            return Err(ChurnError::SchemaMismatch {
                expected: expected.join(","),
                actual: model.feature_names().join(","),
            });
        }

        Ok(Self {
            config,
            preprocessor: Arc::new(preprocessor),
            model: Arc::new(model),
        })
    }

    /// Load the context from a training run's artifacts
    pub fn load(config: InferenceConfig, store: &ArtifactStore) -> Result<Self> {
        let start = Instant::now();
        let preprocessor = store.load_preprocessor()?;
        let model = store.load_model()?;
        let engine = Self::new(config, preprocessor, model)?;
        info!(
            dir = %store.root().display(),
            features = engine.model.n_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded serving context"
        );
        Ok(engine)
    }

    /// Validate, transform and score one raw record
    pub fn predict_record(&self, record: &RawRecord) -> Result<Prediction> {
        record.validate()?;
        let frame = record.to_frame()?;
        let mut predictions = self.predict_frame(&frame)?;
        let prediction = predictions.pop().ok_or_else(|| {
            ChurnError::InferenceError("no prediction for a one-row frame".to_string())
        })?;
        debug!(
            verdict = %prediction.verdict,
            probability = prediction.probability,
            "Scored record"
        );
        Ok(prediction)
    }

    /// Score every row of a raw frame
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<Prediction>> {
        let TransformOutput { features, report } = self.transform(df)?;
        let probabilities = self.model.predict_proba(&features)?;

        if !report.unknown.is_empty() {
            warn!(
                hits = report.unknown.len(),
                "Scored rows with unknown categories"
            );
        }

        let mut flags_by_row: Vec<Vec<UnknownCategoryHit>> = vec![Vec::new(); df.height()];
        for hit in report.unknown {
            if let Some(flags) = flags_by_row.get_mut(hit.row) {
                flags.push(hit);
            }
        }

        Ok(features
            .rows()
            .into_iter()
            .zip(probabilities.iter())
            .zip(flags_by_row)
            .map(|((row, &probability), flags)| Prediction {
                verdict: Verdict::from_probability(
                    probability,
                    self.config.classification_threshold,
                ),
                probability,
                features: row.to_vec(),
                flags,
            })
            .collect())
    }

    /// Feature matrix of a raw frame under the configured policy
    pub fn transform(&self, df: &DataFrame) -> Result<TransformOutput> {
        self.preprocessor
            .transform(df, self.config.unknown_category)
    }

    pub fn feature_names(&self) -> &[String] {
        self.model.feature_names()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &ChurnPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }
}
