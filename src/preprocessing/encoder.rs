//! Categorical encoding implementations

use super::{string_column, BinaryMapping};
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// What to do with a category outside the frozen vocabulary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownCategoryPolicy {
    /// Fail with [`ChurnError::UnknownCategory`]
    #[default]
    Reject,
    /// Use the documented fallback: all-zero for one-hot, the configured code
    /// for binary maps (binary maps without a configured code still reject)
    Fallback,
}

/// An encoded value and whether the fallback produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded<T> {
    pub value: T,
    pub fallback: bool,
}

impl<T> Encoded<T> {
    fn known(value: T) -> Self {
        Self {
            value,
            fallback: false,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            fallback: true,
        }
    }
}

/// Closed label → {0, 1} encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryEncoder {
    column: String,
    categories: Vec<(String, f64)>,
    fallback: Option<f64>,
    is_fitted: bool,
}

impl BinaryEncoder {
    /// Create an encoder from a declared mapping
    pub fn new(mapping: &BinaryMapping) -> Self {
        Self {
            column: mapping.column.clone(),
            categories: mapping.categories.clone(),
            fallback: mapping.fallback,
            is_fitted: false,
        }
    }

    /// Check the training column against the mapping and freeze it.
    ///
    /// A training label the mapping does not cover is a configuration error.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let values = string_column(df, &self.column)?;
        for label in values.iter().flatten() {
            if self.lookup(label).is_none() {
                return Err(ChurnError::ConfigError(format!(
                    "training value '{}' in '{}' is not covered by its binary mapping",
                    label, self.column
                )));
            }
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode one label
    pub fn encode(&self, label: &str, policy: UnknownCategoryPolicy) -> Result<Encoded<f64>> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        if let Some(code) = self.lookup(label) {
            return Ok(Encoded::known(code));
        }
        match (policy, self.fallback) {
            (UnknownCategoryPolicy::Fallback, Some(code)) => Ok(Encoded::fallback(code)),
            _ => Err(ChurnError::UnknownCategory {
                column: self.column.clone(),
                value: label.to_string(),
            }),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[(String, f64)] {
        &self.categories
    }

    pub fn fallback(&self) -> Option<f64> {
        self.fallback
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn lookup(&self, label: &str) -> Option<f64> {
        self.categories
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, code)| *code)
    }
}

/// One-hot encoder over the sorted training vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create a new encoder for a column
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            categories: Vec::new(),
            is_fitted: false,
        }
    }

    /// Enumerate the distinct training values, sorted, as the frozen vocabulary
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let values = string_column(df, &self.column)?;
        let vocabulary: BTreeSet<String> = values.into_iter().flatten().collect();
        if vocabulary.is_empty() {
            return Err(ChurnError::PreprocessingError(format!(
                "cannot fit one-hot encoder on '{}': no values",
                self.column
            )));
        }

        self.categories = vocabulary.into_iter().collect();
        self.is_fitted = true;
        debug!(column = %self.column, categories = ?self.categories, "Fitted one-hot encoder");
        Ok(self)
    }

    /// Expand one label to a vector of the frozen width
    pub fn encode(&self, label: &str, policy: UnknownCategoryPolicy) -> Result<Encoded<Vec<f64>>> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        let mut row = vec![0.0; self.categories.len()];
        match self.categories.iter().position(|c| c == label) {
            Some(idx) => {
                row[idx] = 1.0;
                Ok(Encoded::known(row))
            }
            None => match policy {
                UnknownCategoryPolicy::Fallback => Ok(Encoded::fallback(row)),
                UnknownCategoryPolicy::Reject => Err(ChurnError::UnknownCategory {
                    column: self.column.clone(),
                    value: label.to_string(),
                }),
            },
        }
    }

    /// Output column names, `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    /// Number of output columns
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gender_encoder() -> BinaryEncoder {
        let mapping = BinaryMapping::new("Gender", &[("Male", 1.0), ("Female", 0.0)]);
        let df = df!("Gender" => &["Male", "Female", "Female"]).unwrap();
        let mut encoder = BinaryEncoder::new(&mapping);
        encoder.fit(&df).unwrap();
        encoder
    }

    #[test]
    fn test_binary_encoding() {
        let encoder = gender_encoder();
        assert_eq!(encoder.encode("Male", UnknownCategoryPolicy::Reject).unwrap().value, 1.0);
        assert_eq!(encoder.encode("Female", UnknownCategoryPolicy::Reject).unwrap().value, 0.0);
    }

    #[test]
    fn test_binary_unknown_without_fallback_rejects() {
        let encoder = gender_encoder();
        for policy in [UnknownCategoryPolicy::Reject, UnknownCategoryPolicy::Fallback] {
            let err = encoder.encode("Other", policy).unwrap_err();
            assert!(matches!(err, ChurnError::UnknownCategory { .. }));
        }
    }

    #[test]
    fn test_binary_unknown_with_fallback() {
        let mapping =
            BinaryMapping::new("Gender", &[("Male", 1.0), ("Female", 0.0)]).with_fallback(0.0);
        let df = df!("Gender" => &["Male"]).unwrap();
        let mut encoder = BinaryEncoder::new(&mapping);
        encoder.fit(&df).unwrap();

        let encoded = encoder.encode("Other", UnknownCategoryPolicy::Fallback).unwrap();
        assert_eq!(encoded.value, 0.0);
        assert!(encoded.fallback);
        assert!(encoder.encode("Other", UnknownCategoryPolicy::Reject).is_err());
    }

    #[test]
    fn test_binary_fit_rejects_uncovered_training_value() {
        let mapping = BinaryMapping::new("Gender", &[("Male", 1.0), ("Female", 0.0)]);
        let df = df!("Gender" => &["Male", "male"]).unwrap();
        let mut encoder = BinaryEncoder::new(&mapping);
        assert!(matches!(encoder.fit(&df), Err(ChurnError::ConfigError(_))));
    }

    #[test]
    fn test_onehot_vocabulary_is_sorted() {
        let df = df!("Geography" => &["Spain", "France", "Germany", "France"]).unwrap();
        let mut encoder = OneHotEncoder::new("Geography");
        encoder.fit(&df).unwrap();

        assert_eq!(encoder.categories(), &["France", "Germany", "Spain"]);
        assert_eq!(
            encoder.feature_names(),
            vec!["Geography_France", "Geography_Germany", "Geography_Spain"]
        );
        let row = encoder.encode("Germany", UnknownCategoryPolicy::Reject).unwrap();
        assert_eq!(row.value, vec![0.0, 1.0, 0.0]);
        assert!(!row.fallback);
    }

    #[test]
    fn test_onehot_unknown_is_all_zero_of_frozen_width() {
        let df = df!("Geography" => &["France", "Spain"]).unwrap();
        let mut encoder = OneHotEncoder::new("Geography");
        encoder.fit(&df).unwrap();

        let row = encoder.encode("Germany", UnknownCategoryPolicy::Fallback).unwrap();
        assert_eq!(row.value, vec![0.0, 0.0]);
        assert!(row.fallback);
        assert_eq!(encoder.width(), 2);

        let err = encoder.encode("Germany", UnknownCategoryPolicy::Reject).unwrap_err();
        assert!(matches!(err, ChurnError::UnknownCategory { .. }));
    }

    #[test]
    fn test_unfitted_encoders() {
        let encoder = OneHotEncoder::new("Geography");
        assert!(matches!(
            encoder.encode("France", UnknownCategoryPolicy::Fallback),
            Err(ChurnError::ModelNotFitted)
        ));
    }
}
