//! Missing value imputation strategies

use super::{finite_values, numeric_column, scaler::quantile_sorted, ImputeSpec};
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the training mean
    Mean,
    /// Replace with the training median
    Median,
    /// Replace with the most frequent training value; ties pick the smallest
    MostFrequent,
}

/// Imputer holding one frozen fill value per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    fill_values: Vec<(String, ImputeStrategy, f64)>,
    is_fitted: bool,
}

impl Default for Imputer {
    fn default() -> Self {
        Self::new()
    }
}

impl Imputer {
    pub fn new() -> Self {
        Self {
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Compute fill values from the training frame
    pub fn fit(&mut self, df: &DataFrame, specs: &[ImputeSpec]) -> Result<&mut Self> {
        let mut fill_values = Vec::with_capacity(specs.len());
        for spec in specs {
            let values = finite_values(&numeric_column(df, &spec.column)?);
            if values.is_empty() {
                return Err(ChurnError::PreprocessingError(format!(
                    "cannot impute '{}': no observed values",
                    spec.column
                )));
            }
            let fill = compute_fill_value(spec.strategy, values);
            debug!(column = %spec.column, strategy = ?spec.strategy, fill, "Fitted imputer");
            fill_values.push((spec.column.clone(), spec.strategy, fill));
        }

        self.fill_values = fill_values;
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace nulls of a column with its fill value.
    ///
    /// Columns without a strategy pass through untouched. Returns the filled
    /// values and how many were replaced.
    pub fn fill(&self, column: &str, values: Vec<Option<f64>>) -> Result<(Vec<Option<f64>>, usize)> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        let Some(fill) = self.fill_value(column) else {
            return Ok((values, 0));
        };

        let mut replaced = 0;
        let filled = values
            .into_iter()
            .map(|v| {
                v.or_else(|| {
                    replaced += 1;
                    Some(fill)
                })
            })
            .collect();
        Ok((filled, replaced))
    }

    /// Frozen fill value of a column
    pub fn fill_value(&self, column: &str) -> Option<f64> {
        self.fill_values
            .iter()
            .find(|(name, _, _)| name == column)
            .map(|(_, _, fill)| *fill)
    }

    /// Imputed columns with their strategy and fill value
    pub fn fill_values(&self) -> &[(String, ImputeStrategy, f64)] {
        &self.fill_values
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn compute_fill_value(strategy: ImputeStrategy, mut values: Vec<f64>) -> f64 {
    match strategy {
        ImputeStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
        ImputeStrategy::Median => {
            values.sort_by(f64::total_cmp);
            quantile_sorted(&values, 0.5)
        }
        ImputeStrategy::MostFrequent => {
            let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
            for v in &values {
                *counts.entry(ordered_bits(*v)).or_insert(0) += 1;
            }
            // BTreeMap iterates ascending, so the first maximum is the smallest value
            let mut best = (0u64, 0usize);
            for (bits, count) in counts {
                if count > best.1 {
                    best = (bits, count);
                }
            }
            from_ordered_bits(best.0)
        }
    }
}

/// Map an f64 to bits whose unsigned order matches numeric order
fn ordered_bits(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

fn from_ordered_bits(bits: u64) -> f64 {
    if bits >> 63 == 1 {
        f64::from_bits(bits & !(1 << 63))
    } else {
        f64::from_bits(!bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(strategy: ImputeStrategy, values: &[Option<f64>]) -> Imputer {
        let df = df!("x" => values).unwrap();
        let mut imputer = Imputer::new();
        imputer.fit(&df, &[ImputeSpec::new("x", strategy)]).unwrap();
        imputer
    }

    #[test]
    fn test_mean_imputation() {
        let imputer = fit(ImputeStrategy::Mean, &[Some(1.0), None, Some(3.0), Some(8.0)]);
        assert_eq!(imputer.fill_value("x"), Some(4.0));

        let (filled, replaced) = imputer.fill("x", vec![None, Some(2.0), None]).unwrap();
        assert_eq!(filled, vec![Some(4.0), Some(2.0), Some(4.0)]);
        assert_eq!(replaced, 2);
    }

    #[test]
    fn test_median_imputation() {
        let imputer = fit(ImputeStrategy::Median, &[Some(1.0), Some(9.0), None, Some(3.0), Some(4.0)]);
        assert_eq!(imputer.fill_value("x"), Some(3.5));
    }

    #[test]
    fn test_most_frequent_ties_pick_smallest() {
        let imputer = fit(
            ImputeStrategy::MostFrequent,
            &[Some(5.0), Some(-2.0), Some(5.0), Some(-2.0), Some(7.0)],
        );
        assert_eq!(imputer.fill_value("x"), Some(-2.0));

        let imputer = fit(ImputeStrategy::MostFrequent, &[Some(3.0), Some(1.0), Some(3.0)]);
        assert_eq!(imputer.fill_value("x"), Some(3.0));
    }

    #[test]
    fn test_all_missing_column_is_error() {
        let df = df!("x" => &[None::<f64>, None]).unwrap();
        let mut imputer = Imputer::new();
        let result = imputer.fit(&df, &[ImputeSpec::new("x", ImputeStrategy::Mean)]);
        assert!(matches!(result, Err(ChurnError::PreprocessingError(_))));
    }

    #[test]
    fn test_unconfigured_column_passes_through() {
        let imputer = fit(ImputeStrategy::Mean, &[Some(1.0)]);
        let (filled, replaced) = imputer.fill("y", vec![None, Some(1.0)]).unwrap();
        assert_eq!(filled, vec![None, Some(1.0)]);
        assert_eq!(replaced, 0);
    }

    #[test]
    fn test_unfitted_imputer() {
        let imputer = Imputer::new();
        assert!(matches!(imputer.fill("x", vec![None]), Err(ChurnError::ModelNotFitted)));
    }

    #[test]
    fn test_ordered_bits_roundtrip() {
        for v in [-3.5, -0.0, 0.0, 1.0, 1e300] {
            assert_eq!(from_ordered_bits(ordered_bits(v)).to_bits(), v.to_bits());
        }
        assert!(ordered_bits(-1.0) < ordered_bits(0.5));
    }
}
