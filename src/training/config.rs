//! Training configuration

use super::XGBoostConfig;
use crate::data::columns;
use crate::error::{ChurnError, Result};
use crate::preprocessing::PreprocessingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Seed of the partition shuffle
    pub random_state: u64,

    /// Feature pipeline
    pub preprocessing: PreprocessingConfig,

    /// Classifier hyperparameters
    pub xgboost: XGBoostConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: columns::EXITED.to_string(),
            test_size: 0.2,
            random_state: 42,
            preprocessing: PreprocessingConfig::default(),
            xgboost: XGBoostConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_column: target.into(),
            ..Default::default()
        }
    }

    /// Read a JSON configuration file; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| ChurnError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Builder method to set the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to replace the feature pipeline
    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    /// Builder method to replace the classifier hyperparameters
    pub fn with_xgboost(mut self, xgboost: XGBoostConfig) -> Self {
        self.xgboost = xgboost;
        self
    }

    /// Builder method to set number of estimators
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.xgboost.n_estimators = n;
        self
    }

    /// Check every section before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.target_column.is_empty() {
            return Err(ChurnError::ConfigError("target column is empty".to_string()));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ChurnError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        if self
            .preprocessing
            .features
            .iter()
            .any(|f| f.column == self.target_column)
        {
            return Err(ChurnError::ConfigError(format!(
                "target column '{}' is also declared as a feature",
                self.target_column
            )));
        }
        self.preprocessing.validate()?;
        self.xgboost.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.target_column, "Exited");
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_state, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainingConfig::new("Churned")
            .with_test_size(0.3)
            .with_random_state(7)
            .with_n_estimators(25);
        assert_eq!(config.target_column, "Churned");
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.random_state, 7);
        assert_eq!(config.xgboost.n_estimators, 25);
    }

    #[test]
    fn test_invalid_test_size() {
        for test_size in [0.0, 1.0, -0.1, f64::NAN] {
            let config = TrainingConfig::default().with_test_size(test_size);
            assert!(matches!(
                config.validate(),
                Err(ChurnError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_target_declared_as_feature() {
        let config = TrainingConfig::default().with_target("Age");
        assert!(matches!(config.validate(), Err(ChurnError::ConfigError(_))));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"test_size": 0.25, "xgboost": {"max_depth": 4}}"#).unwrap();
        assert_eq!(config.test_size, 0.25);
        assert_eq!(config.xgboost.max_depth, 4);
        assert_eq!(config.xgboost.n_estimators, 200);
        assert_eq!(config.preprocessing, PreprocessingConfig::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        std::fs::write(&path, r#"{"target_column": "Exited", "random_state": 1}"#).unwrap();
        let config = TrainingConfig::from_file(&path).unwrap();
        assert_eq!(config.random_state, 1);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            TrainingConfig::from_file(&path),
            Err(ChurnError::ConfigError(_))
        ));
    }
}
