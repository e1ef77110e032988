//! Training engine implementation

use super::{ClassificationReport, Model, ModelMetrics, TrainingConfig, XGBoostClassifier};
use crate::data::ChurnDataset;
use crate::error::{ChurnError, Result};
use crate::preprocessing::{ChurnPreprocessor, TransformReport, UnknownCategoryPolicy};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Classifier together with the feature names it was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    feature_names: Vec<String>,
    classifier: XGBoostClassifier,
}

impl TrainedModel {
    /// Pair a fitted classifier with its feature names
    pub fn new(feature_names: Vec<String>, classifier: XGBoostClassifier) -> Result<Self> {
        if classifier.n_features() != feature_names.len() {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("{} feature names", classifier.n_features()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        Ok(Self {
            feature_names,
            classifier,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn classifier(&self) -> &XGBoostClassifier {
        &self.classifier
    }

    /// Churn probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", x.ncols()),
            });
        }
        self.classifier.predict_proba(x)
    }

    /// 0/1 label per row at the given probability threshold
    pub fn predict(&self, x: &Array2<f64>, threshold: f64) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= threshold { 1.0 } else { 0.0 }))
    }

    /// Importances keyed by feature name, highest first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let Some(importances) = self.classifier.feature_importances() else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Row counts of the partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub preprocessor: ChurnPreprocessor,
    pub model: TrainedModel,
    pub metrics: ModelMetrics,
    pub report: ClassificationReport,
    /// Fallbacks and imputations applied to the held-out rows
    pub test_transform: TransformReport,
    pub sizes: SplitSizes,
}

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Separate the target column from a raw frame and train on it
    pub fn train_frame(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        self.config.validate()?;
        let dataset = ChurnDataset::from_frame(df, &self.config.target_column)?;
        self.run(dataset)
    }

    /// Prune, split, fit the feature pipeline on the training rows, fit the
    /// classifier and evaluate it on the held-out rows
    pub fn run(&self, mut dataset: ChurnDataset) -> Result<TrainingOutcome> {
        let start = Instant::now();
        self.config.validate()?;

        let dropped = dataset.drop_columns(&self.config.preprocessing.drop_columns)?;
        let partition = dataset.split(self.config.test_size, self.config.random_state)?;
        let sizes = SplitSizes {
            train: partition.x_train.height(),
            test: partition.x_test.height(),
        };
        info!(
            rows = dataset.len(),
            train = sizes.train,
            test = sizes.test,
            dropped = ?dropped,
            churn_rate = dataset.churn_rate(),
            "Partitioned dataset"
        );

        let mut preprocessor = ChurnPreprocessor::new(self.config.preprocessing.clone());
        preprocessor.fit(&partition.x_train)?;
        let train = preprocessor.transform(&partition.x_train, UnknownCategoryPolicy::Reject)?;
        let test = preprocessor.transform(&partition.x_test, UnknownCategoryPolicy::Fallback)?;
        if !test.report.unknown.is_empty() {
            warn!(
                rows = test.report.unknown.len(),
                "Held-out rows contain categories unseen in training"
            );
        }

        let mut classifier = XGBoostClassifier::new(self.config.xgboost.clone());
        classifier.fit(&train.features, &partition.y_train)?;
        let model = TrainedModel::new(preprocessor.feature_names()?.to_vec(), classifier)?;

        let y_prob = model.predict_proba(&test.features)?;
        let y_pred = model.predict(&test.features, 0.5)?;
        let mut metrics =
            ModelMetrics::compute_classification(&partition.y_test, &y_pred, Some(&y_prob));
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_features = model.n_features();
        let report = ClassificationReport::from_confusion(&metrics.confusion);

        info!(
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            auc = ?metrics.auc_roc,
            secs = metrics.training_time_secs,
            "Training complete"
        );

        Ok(TrainingOutcome {
            preprocessor,
            model,
            metrics,
            report,
            test_transform: test.report,
            sizes,
        })
    }
}
