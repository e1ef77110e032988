//! Preprocessing configuration

use super::ImputeStrategy;
use crate::data::columns;
use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a raw column becomes one or more features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Numeric value passed through
    Numeric,
    /// Numeric 0/1 flag passed through; other values are rejected
    Flag,
    /// Categorical value mapped through a closed binary mapping
    Binary,
    /// Numeric value centered on the median and divided by the IQR
    Robust,
    /// Numeric value mapped linearly from the training range to [0, 1]
    MinMax,
    /// Categorical value expanded against the frozen training vocabulary
    OneHot,
}

impl FeatureKind {
    /// Whether the raw column is read as numbers
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FeatureKind::Binary | FeatureKind::OneHot)
    }
}

/// One declared feature, in assembly order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub column: String,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub fn new(column: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }
}

/// Closed label → {0, 1} mapping for a [`FeatureKind::Binary`] column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMapping {
    pub column: String,
    /// Ordered (label, code) pairs
    pub categories: Vec<(String, f64)>,
    /// Code used for unseen labels under the fallback policy; `None` always rejects
    pub fallback: Option<f64>,
}

impl BinaryMapping {
    pub fn new(column: impl Into<String>, categories: &[(&str, f64)]) -> Self {
        Self {
            column: column.into(),
            categories: categories
                .iter()
                .map(|(label, code)| (label.to_string(), *code))
                .collect(),
            fallback: None,
        }
    }

    /// Builder method to set the unseen-label code
    pub fn with_fallback(mut self, code: f64) -> Self {
        self.fallback = Some(code);
        self
    }
}

/// Missing-value strategy for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputeSpec {
    pub column: String,
    pub strategy: ImputeStrategy,
}

impl ImputeSpec {
    pub fn new(column: impl Into<String>, strategy: ImputeStrategy) -> Self {
        Self {
            column: column.into(),
            strategy,
        }
    }
}

/// Configuration for the churn feature pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Identifier / free-text columns removed before anything else
    pub drop_columns: Vec<String>,

    /// Declared feature order; one-hot columns expand in place
    pub features: Vec<FeatureSpec>,

    /// Mappings for every binary-encoded column
    pub binary_mappings: Vec<BinaryMapping>,

    /// Imputation strategies for numeric columns
    pub imputation: Vec<ImputeSpec>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        use FeatureKind::*;
        Self {
            drop_columns: columns::IDENTIFIERS.iter().map(|s| s.to_string()).collect(),
            features: vec![
                FeatureSpec::new(columns::CREDIT_SCORE, Robust),
                FeatureSpec::new(columns::GENDER, Binary),
                FeatureSpec::new(columns::AGE, Robust),
                FeatureSpec::new(columns::TENURE, Numeric),
                FeatureSpec::new(columns::BALANCE, MinMax),
                FeatureSpec::new(columns::NUM_OF_PRODUCTS, Numeric),
                FeatureSpec::new(columns::HAS_CR_CARD, Flag),
                FeatureSpec::new(columns::IS_ACTIVE_MEMBER, Flag),
                FeatureSpec::new(columns::ESTIMATED_SALARY, MinMax),
                FeatureSpec::new(columns::GEOGRAPHY, OneHot),
            ],
            binary_mappings: vec![BinaryMapping::new(
                columns::GENDER,
                &[("Male", 1.0), ("Female", 0.0)],
            )],
            imputation: vec![ImputeSpec::new(columns::CREDIT_SCORE, ImputeStrategy::Mean)],
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with the churn defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to replace the pruned column list
    pub fn with_drop_columns(mut self, columns: &[&str]) -> Self {
        self.drop_columns = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Builder method to replace the declared features
    pub fn with_features(mut self, features: Vec<FeatureSpec>) -> Self {
        self.features = features;
        self
    }

    /// Builder method to add or replace a binary mapping
    pub fn with_binary_mapping(mut self, mapping: BinaryMapping) -> Self {
        self.binary_mappings.retain(|m| m.column != mapping.column);
        self.binary_mappings.push(mapping);
        self
    }

    /// Builder method to add or replace an imputation strategy
    pub fn with_imputation(mut self, column: &str, strategy: ImputeStrategy) -> Self {
        self.imputation.retain(|s| s.column != column);
        self.imputation.push(ImputeSpec::new(column, strategy));
        self
    }

    /// Columns of the given kind, in declared order
    pub fn columns_of(&self, kind: FeatureKind) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.column.as_str())
            .collect()
    }

    /// Binary mapping for a column
    pub fn binary_mapping(&self, column: &str) -> Option<&BinaryMapping> {
        self.binary_mappings.iter().find(|m| m.column == column)
    }

    /// Check the configuration is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(ChurnError::ConfigError("no features declared".to_string()));
        }

        let mut seen = HashSet::new();
        for spec in &self.features {
            if !seen.insert(spec.column.as_str()) {
                return Err(ChurnError::ConfigError(format!(
                    "feature column '{}' declared twice",
                    spec.column
                )));
            }
            if self.drop_columns.contains(&spec.column) {
                return Err(ChurnError::ConfigError(format!(
                    "feature column '{}' is also listed for pruning",
                    spec.column
                )));
            }
        }

        for column in self.columns_of(FeatureKind::Binary) {
            let mapping = self.binary_mapping(column).ok_or_else(|| {
                ChurnError::ConfigError(format!("binary column '{}' has no mapping", column))
            })?;
            if mapping.categories.is_empty() {
                return Err(ChurnError::ConfigError(format!(
                    "binary mapping for '{}' is empty",
                    column
                )));
            }
            let codes = mapping
                .categories
                .iter()
                .map(|(_, code)| *code)
                .chain(mapping.fallback);
            for code in codes {
                if code != 0.0 && code != 1.0 {
                    return Err(ChurnError::InvalidParameter {
                        name: format!("binary_mappings.{}", column),
                        value: code.to_string(),
                        reason: "codes must be 0 or 1".to_string(),
                    });
                }
            }
        }

        for spec in &self.imputation {
            let feature = self.features.iter().find(|f| f.column == spec.column);
            match feature {
                Some(f) if f.kind.is_numeric() => {}
                Some(_) => {
                    return Err(ChurnError::ConfigError(format!(
                        "imputation for '{}' requires a numeric feature",
                        spec.column
                    )))
                }
                None => {
                    return Err(ChurnError::ConfigError(format!(
                        "imputation for '{}' which is not a declared feature",
                        spec.column
                    )))
                }
            }
        }

        Ok(())
    }
}
