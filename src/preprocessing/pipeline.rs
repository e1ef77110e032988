//! Churn feature pipeline

use super::{
    numeric_column, string_column, BinaryEncoder, FeatureBlock, FeatureKind, FeatureLayout,
    Imputer, OneHotEncoder, PreprocessingConfig, Scaler, ScalerType, UnknownCategoryPolicy,
};
use crate::error::{ChurnError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fitted categorical encoders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    pub binary: Vec<BinaryEncoder>,
    pub onehot: Vec<OneHotEncoder>,
}

impl EncoderState {
    fn binary(&self, column: &str) -> Result<&BinaryEncoder> {
        self.binary
            .iter()
            .find(|e| e.column() == column)
            .ok_or_else(|| ChurnError::FeatureNotFound(format!("{} (binary encoder)", column)))
    }

    fn onehot(&self, column: &str) -> Result<&OneHotEncoder> {
        self.onehot
            .iter()
            .find(|e| e.column() == column)
            .ok_or_else(|| ChurnError::FeatureNotFound(format!("{} (one-hot encoder)", column)))
    }
}

/// Fitted scalers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub robust: Scaler,
    pub minmax: Scaler,
}

/// A category outside the frozen vocabulary that was encoded with the fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownCategoryHit {
    pub row: usize,
    pub column: String,
    pub value: String,
}

/// What a transform had to do beyond applying frozen parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformReport {
    pub rows: usize,
    /// (column, number of imputed values)
    pub imputed: Vec<(String, usize)>,
    pub unknown: Vec<UnknownCategoryHit>,
}

impl TransformReport {
    /// No imputation or fallback happened
    pub fn is_clean(&self) -> bool {
        self.imputed.is_empty() && self.unknown.is_empty()
    }
}

/// Feature matrix with its report
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub features: Array2<f64>,
    pub report: TransformReport,
}

/// Fit-once, apply-many preprocessor shared by training and serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnPreprocessor {
    config: PreprocessingConfig,
    layout: Option<FeatureLayout>,
    encoders: Option<EncoderState>,
    imputer: Option<Imputer>,
    scalers: Option<ScalerState>,
    is_fitted: bool,
}

impl Default for ChurnPreprocessor {
    fn default() -> Self {
        Self::new(PreprocessingConfig::default())
    }
}

impl ChurnPreprocessor {
    /// Create an unfitted preprocessor
    pub fn new(config: PreprocessingConfig) -> Self {
        Self {
            config,
            layout: None,
            encoders: None,
            imputer: None,
            scalers: None,
            is_fitted: false,
        }
    }

    /// Rebuild a fitted preprocessor from persisted state.
    ///
    /// The pieces must describe the same feature layout.
    pub fn from_frozen(
        config: PreprocessingConfig,
        layout: FeatureLayout,
        encoders: EncoderState,
        imputer: Imputer,
        scalers: ScalerState,
    ) -> Result<Self> {
        config.validate()?;
        if layout.specs() != config.features.as_slice() {
            return Err(ChurnError::ArtifactError(
                "feature layout does not match the configured features".to_string(),
            ));
        }

        let resolved = FeatureLayout::resolve(layout.specs(), &encoders.onehot)?;
        if resolved.feature_names() != layout.feature_names() {
            return Err(ChurnError::SchemaMismatch {
                expected: layout.feature_names().join(","),
                actual: resolved.feature_names().join(","),
            });
        }

        let fitted = encoders.binary.iter().all(BinaryEncoder::is_fitted)
            && encoders.onehot.iter().all(OneHotEncoder::is_fitted)
            && imputer.is_fitted()
            && scalers.robust.is_fitted()
            && scalers.minmax.is_fitted();
        if !fitted {
            return Err(ChurnError::ArtifactError(
                "persisted preprocessor state is not fitted".to_string(),
            ));
        }

        for spec in &config.features {
            match spec.kind {
                FeatureKind::Binary => {
                    encoders.binary(&spec.column)?;
                }
                FeatureKind::Robust if scalers.robust.params(&spec.column).is_none() => {
                    return Err(ChurnError::ArtifactError(format!(
                        "no robust scaler parameters for '{}'",
                        spec.column
                    )))
                }
                FeatureKind::MinMax if scalers.minmax.params(&spec.column).is_none() => {
                    return Err(ChurnError::ArtifactError(format!(
                        "no min-max scaler parameters for '{}'",
                        spec.column
                    )))
                }
                _ => {}
            }
        }

        Ok(Self {
            config,
            layout: Some(layout),
            encoders: Some(encoders),
            imputer: Some(imputer),
            scalers: Some(scalers),
            is_fitted: true,
        })
    }

    /// Fit every transformer on the training frame.
    ///
    /// Statistics are computed from `df` only; refitting replaces them.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();
        self.config.validate()?;

        for spec in &self.config.features {
            if df.column(&spec.column).is_err() {
                return Err(ChurnError::FeatureNotFound(spec.column.clone()));
            }
        }

        let mut imputer = Imputer::new();
        imputer.fit(df, &self.config.imputation)?;
        let imputed = impute_frame(df, &imputer)?;

        let mut binary = Vec::new();
        for column in self.config.columns_of(FeatureKind::Binary) {
            let mapping = self.config.binary_mapping(column).ok_or_else(|| {
                ChurnError::ConfigError(format!("binary column '{}' has no mapping", column))
            })?;
            let mut encoder = BinaryEncoder::new(mapping);
            encoder.fit(df)?;
            binary.push(encoder);
        }

        let mut onehot = Vec::new();
        for column in self.config.columns_of(FeatureKind::OneHot) {
            let mut encoder = OneHotEncoder::new(column);
            encoder.fit(df)?;
            onehot.push(encoder);
        }

        let mut robust = Scaler::new(ScalerType::Robust);
        robust.fit(&imputed, &self.config.columns_of(FeatureKind::Robust))?;
        let mut minmax = Scaler::new(ScalerType::MinMax);
        minmax.fit(&imputed, &self.config.columns_of(FeatureKind::MinMax))?;

        let layout = FeatureLayout::resolve(&self.config.features, &onehot)?;
        info!(
            rows = df.height(),
            features = layout.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted preprocessor"
        );

        self.layout = Some(layout);
        self.encoders = Some(EncoderState { binary, onehot });
        self.imputer = Some(imputer);
        self.scalers = Some(ScalerState { robust, minmax });
        self.is_fitted = true;
        Ok(self)
    }

    /// Turn raw rows into the feature matrix using the frozen state.
    ///
    /// Batches and single records go through this same routine.
    pub fn transform(&self, df: &DataFrame, policy: UnknownCategoryPolicy) -> Result<TransformOutput> {
        let (layout, encoders, imputer, scalers) = self.fitted_state()?;
        let n_rows = df.height();
        let mut report = TransformReport {
            rows: n_rows,
            ..Default::default()
        };

        let mut blocks = Vec::with_capacity(layout.specs().len());
        for spec in layout.specs() {
            let column = spec.column.as_str();
            let block = match spec.kind {
                FeatureKind::Binary => {
                    let encoder = encoders.binary(column)?;
                    let labels = complete_labels(column, string_column(df, column)?)?;
                    let mut values = Vec::with_capacity(n_rows);
                    for (row, label) in labels.iter().enumerate() {
                        let encoded = encoder.encode(label, policy)?;
                        if encoded.fallback {
                            record_fallback(&mut report, row, column, label);
                        }
                        values.push(encoded.value);
                    }
                    FeatureBlock::single(column, values)
                }
                FeatureKind::OneHot => {
                    let encoder = encoders.onehot(column)?;
                    let labels = complete_labels(column, string_column(df, column)?)?;
                    let mut columns = vec![Vec::with_capacity(n_rows); encoder.width()];
                    for (row, label) in labels.iter().enumerate() {
                        let encoded = encoder.encode(label, policy)?;
                        if encoded.fallback {
                            record_fallback(&mut report, row, column, label);
                        }
                        for (out, value) in columns.iter_mut().zip(encoded.value) {
                            out.push(value);
                        }
                    }
                    FeatureBlock {
                        source: column.to_string(),
                        columns,
                    }
                }
                kind => {
                    let (filled, replaced) = imputer.fill(column, numeric_column(df, column)?)?;
                    if replaced > 0 {
                        debug!(column, replaced, "Imputed missing values");
                        report.imputed.push((column.to_string(), replaced));
                    }
                    let values = complete_numbers(column, filled)?;
                    let values = match kind {
                        FeatureKind::Robust => scalers.robust.transform_values(column, &values)?,
                        FeatureKind::MinMax => scalers.minmax.transform_values(column, &values)?,
                        FeatureKind::Flag => {
                            check_flags(column, &values)?;
                            values
                        }
                        _ => values,
                    };
                    FeatureBlock::single(column, values)
                }
            };
            blocks.push(block);
        }

        let features = layout.assemble(n_rows, blocks)?;
        debug!(rows = n_rows, unknown = report.unknown.len(), "Transformed frame");
        Ok(TransformOutput { features, report })
    }

    /// Fit on a frame and transform it, rejecting unknown categories
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<TransformOutput> {
        self.fit(df)?;
        self.transform(df, UnknownCategoryPolicy::Reject)
    }

    /// Output feature names in column order
    pub fn feature_names(&self) -> Result<&[String]> {
        Ok(self.fitted_state()?.0.feature_names())
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn layout(&self) -> Option<&FeatureLayout> {
        self.layout.as_ref()
    }

    pub fn encoders(&self) -> Option<&EncoderState> {
        self.encoders.as_ref()
    }

    pub fn imputer(&self) -> Option<&Imputer> {
        self.imputer.as_ref()
    }

    pub fn scalers(&self) -> Option<&ScalerState> {
        self.scalers.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn fitted_state(&self) -> Result<(&FeatureLayout, &EncoderState, &Imputer, &ScalerState)> {
        match (&self.layout, &self.encoders, &self.imputer, &self.scalers) {
            (Some(layout), Some(encoders), Some(imputer), Some(scalers)) if self.is_fitted => {
                Ok((layout, encoders, imputer, scalers))
            }
            _ => Err(ChurnError::ModelNotFitted),
        }
    }
}

/// Copy of `df` with the imputed columns filled
fn impute_frame(df: &DataFrame, imputer: &Imputer) -> Result<DataFrame> {
    let mut result = df.clone();
    for (column, _, _) in imputer.fill_values() {
        let (filled, _) = imputer.fill(column, numeric_column(df, column)?)?;
        result.with_column(Column::new(column.as_str().into(), filled))?;
    }
    Ok(result)
}

fn complete_numbers(column: &str, values: Vec<Option<f64>>) -> Result<Vec<f64>> {
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        return Err(ChurnError::ValidationError(format!(
            "column '{}' has {} missing value(s) and no imputation strategy",
            column, missing
        )));
    }
    Ok(values.into_iter().flatten().collect())
}

fn complete_labels(column: &str, values: Vec<Option<String>>) -> Result<Vec<String>> {
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        return Err(ChurnError::ValidationError(format!(
            "column '{}' has {} missing value(s)",
            column, missing
        )));
    }
    Ok(values.into_iter().flatten().collect())
}

fn check_flags(column: &str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| **v != 0.0 && **v != 1.0) {
        Some(v) => Err(ChurnError::ValidationError(format!(
            "column '{}' must be 0 or 1, got {}",
            column, v
        ))),
        None => Ok(()),
    }
}

fn record_fallback(report: &mut TransformReport, row: usize, column: &str, value: &str) {
    warn!(row, column, value, "Unknown category encoded with fallback");
    report.unknown.push(UnknownCategoryHit {
        row,
        column: column.to_string(),
        value: value.to_string(),
    });
}
