//! Feature scaling implementations

use super::{finite_values, numeric_column};
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
}

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// min (MinMax) or median (Robust)
    pub center: f64,
    /// range (MinMax) or IQR (Robust); 1.0 when the spread is zero
    pub scale: f64,
    /// Smallest training value
    pub data_min: f64,
    /// Largest training value
    pub data_max: f64,
}

impl ScalerParams {
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}

/// Feature scaler with per-column frozen parameters kept in fit order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<(String, ScalerParams)>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the training frame.
    ///
    /// Nulls are ignored; a column without any value is an error.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut params = Vec::with_capacity(columns.len());
        for &col_name in columns {
            let values = finite_values(&numeric_column(df, col_name)?);
            if values.is_empty() {
                return Err(ChurnError::PreprocessingError(format!(
                    "cannot fit {:?} scaler on '{}': no values",
                    self.scaler_type, col_name
                )));
            }
            let p = self.compute_params(values);
            if !(p.center.is_finite() && p.scale.is_finite()) {
                return Err(ChurnError::PreprocessingError(format!(
                    "{:?} scaler on '{}' has non-finite parameters (center {}, scale {})",
                    self.scaler_type, col_name, p.center, p.scale
                )));
            }
            debug!(
                column = col_name,
                scaler = ?self.scaler_type,
                center = p.center,
                scale = p.scale,
                "Fitted scaler"
            );
            params.push((col_name.to_string(), p));
        }

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale one value of a fitted column
    pub fn scale_value(&self, column: &str, value: f64) -> Result<f64> {
        Ok(self.params_for(column)?.apply(value))
    }

    /// Scale a batch of values of a fitted column.
    ///
    /// Element `i` equals `scale_value(column, values[i])`.
    pub fn transform_values(&self, column: &str, values: &[f64]) -> Result<Vec<f64>> {
        let params = self.params_for(column)?;
        Ok(values.iter().map(|&v| params.apply(v)).collect())
    }

    /// Frozen parameters of a column
    pub fn params(&self, column: &str) -> Option<&ScalerParams> {
        self.params
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, p)| p)
    }

    /// Fitted columns, in fit order
    pub fn columns(&self) -> Vec<&str> {
        self.params.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn params_for(&self, column: &str) -> Result<&ScalerParams> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        self.params(column)
            .ok_or_else(|| ChurnError::FeatureNotFound(format!("{} (scaler)", column)))
    }

    fn compute_params(&self, mut values: Vec<f64>) -> ScalerParams {
        values.sort_by(f64::total_cmp);
        let data_min = values[0];
        let data_max = values[values.len() - 1];

        let (center, spread) = match self.scaler_type {
            ScalerType::MinMax => (data_min, data_max - data_min),
            ScalerType::Robust => {
                let median = quantile_sorted(&values, 0.5);
                let q1 = quantile_sorted(&values, 0.25);
                let q3 = quantile_sorted(&values, 0.75);
                (median, q3 - q1)
            }
        };

        ScalerParams {
            center,
            scale: if spread == 0.0 { 1.0 } else { spread },
            data_min,
            data_max,
        }
    }
}

/// Quantile of sorted values with linear interpolation between closest ranks
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
