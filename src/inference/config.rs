//! Inference configuration

use crate::error::{ChurnError, Result};
use crate::preprocessing::UnknownCategoryPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the serving context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Churn probability at or above which the verdict is `Churn`
    pub classification_threshold: f64,

    /// Handling of categories outside the frozen vocabulary
    pub unknown_category: UnknownCategoryPolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            classification_threshold: 0.5,
            unknown_category: UnknownCategoryPolicy::Reject,
        }
    }
}

impl InferenceConfig {
    /// Create a new inference configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set classification threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.classification_threshold = threshold;
        self
    }

    /// Builder method to set the unknown-category policy
    pub fn with_unknown_category(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_category = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.classification_threshold > 0.0 && self.classification_threshold < 1.0) {
            return Err(ChurnError::InvalidParameter {
                name: "classification_threshold".to_string(),
                value: self.classification_threshold.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        Ok(())
    }
}
