//! Feature transformation pipeline
//!
//! Fit-once, apply-many transformers whose frozen state is shared by the
//! training and serving paths:
//! - Missing value imputation (mean, median, most frequent)
//! - Feature scaling (RobustScaler, MinMaxScaler)
//! - Categorical encoding (closed binary maps, one-hot against a frozen vocabulary)
//! - Column assembly in a declared order

mod assembler;
mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use assembler::{FeatureBlock, FeatureLayout};
pub use config::{BinaryMapping, FeatureKind, FeatureSpec, ImputeSpec, PreprocessingConfig};
pub use encoder::{BinaryEncoder, Encoded, OneHotEncoder, UnknownCategoryPolicy};
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::{
    ChurnPreprocessor, EncoderState, ScalerState, TransformOutput, TransformReport,
    UnknownCategoryHit,
};
pub use scaler::{Scaler, ScalerParams, ScalerType};

use crate::error::{ChurnError, Result};
use polars::prelude::*;

/// Read a column as nullable f64 values; NaN counts as missing.
///
/// A present cell that does not parse as a number is a validation error and
/// an infinite value is a data error, so neither can reach a fitted statistic.
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::FeatureNotFound(name.to_string()))?;
    let source = column.as_materialized_series();

    let series = source
        .cast(&DataType::Float64)
        .map_err(|e| ChurnError::DataError(format!("column '{}': {}", name, e)))?;

    let ca = series
        .f64()
        .map_err(|e| ChurnError::DataError(format!("column '{}': {}", name, e)))?;

    // Non-strict casts turn unparsable cells into nulls
    if series.null_count() > source.null_count() {
        return Err(malformed_cell(source, ca, name));
    }

    let mut values = Vec::with_capacity(ca.len());
    for (row, value) in ca.into_iter().enumerate() {
        match value {
            Some(x) if x.is_infinite() => {
                return Err(ChurnError::DataError(format!(
                    "column '{}' row {}: {} is not a finite number",
                    name, row, x
                )))
            }
            Some(x) if x.is_nan() => values.push(None),
            other => values.push(other),
        }
    }
    Ok(values)
}

fn malformed_cell(source: &Series, parsed: &Float64Chunked, name: &str) -> ChurnError {
    let raw = source.cast(&DataType::String).ok();
    let found = raw.as_ref().and_then(|raw| {
        let labels = raw.str().ok()?;
        labels
            .into_iter()
            .zip(parsed.into_iter())
            .enumerate()
            .find_map(|(row, pair)| match pair {
                (Some(label), None) => Some((row, label.to_string())),
                _ => None,
            })
    });

    match found {
        Some((row, label)) => ChurnError::ValidationError(format!(
            "column '{}' row {}: '{}' is not a number",
            name, row, label
        )),
        None => ChurnError::ValidationError(format!(
            "column '{}' contains values that are not numbers",
            name
        )),
    }
}

/// Read a column as nullable strings
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::FeatureNotFound(name.to_string()))?;

    let series = column
        .as_materialized_series()
        .cast(&DataType::String)
        .map_err(|e| ChurnError::DataError(format!("column '{}': {}", name, e)))?;

    let ca = series
        .str()
        .map_err(|e| ChurnError::DataError(format!("column '{}': {}", name, e)))?;

    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Present values only
pub(crate) fn finite_values(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_column_casts_integers() {
        let df = df!("n" => &[1i64, 2, 3]).unwrap();
        let values = numeric_column(&df, "n").unwrap();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_numeric_column_nan_is_missing() {
        let df = df!("n" => &[Some(1.0), Some(f64::NAN), None]).unwrap();
        let values = numeric_column(&df, "n").unwrap();
        assert_eq!(values, vec![Some(1.0), None, None]);
        assert_eq!(finite_values(&values), vec![1.0]);
    }

    #[test]
    fn test_numeric_column_parses_numeric_strings() {
        let df = df!("n" => &[Some("650"), None, Some("700.5")]).unwrap();
        let values = numeric_column(&df, "n").unwrap();
        assert_eq!(values, vec![Some(650.0), None, Some(700.5)]);
    }

    #[test]
    fn test_numeric_column_rejects_malformed_cell() {
        let df = df!("CreditScore" => &[Some("650"), Some("abc"), None]).unwrap();
        let err = numeric_column(&df, "CreditScore").unwrap_err();
        assert!(matches!(err, ChurnError::ValidationError(_)));
        let message = err.to_string();
        assert!(message.contains("CreditScore"), "{}", message);
        assert!(message.contains("abc"), "{}", message);
    }

    #[test]
    fn test_numeric_column_rejects_infinite_values() {
        for bad in [f64::INFINITY, f64::NEG_INFINITY] {
            let df = df!("Balance" => &[1.0, bad, 3.0]).unwrap();
            let err = numeric_column(&df, "Balance").unwrap_err();
            assert!(matches!(err, ChurnError::DataError(_)));
            assert!(err.to_string().contains("row 1"));
        }
    }

    #[test]
    fn test_string_column_missing() {
        let df = df!("s" => &["a", "b"]).unwrap();
        assert!(matches!(
            string_column(&df, "t"),
            Err(ChurnError::FeatureNotFound(_))
        ));
        assert_eq!(
            string_column(&df, "s").unwrap(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }
}
