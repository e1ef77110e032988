//! Final feature layout and matrix assembly

use super::{FeatureKind, FeatureSpec, OneHotEncoder};
use crate::error::{ChurnError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Frozen output layout: declared features with one-hot columns expanded in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    specs: Vec<FeatureSpec>,
    feature_names: Vec<String>,
}

impl FeatureLayout {
    /// Resolve the output columns from the declared features and fitted one-hot encoders
    pub fn resolve(specs: &[FeatureSpec], onehot: &[OneHotEncoder]) -> Result<Self> {
        let mut feature_names = Vec::new();
        for spec in specs {
            match spec.kind {
                FeatureKind::OneHot => {
                    let encoder = onehot
                        .iter()
                        .find(|e| e.column() == spec.column)
                        .ok_or_else(|| {
                            ChurnError::PreprocessingError(format!(
                                "no one-hot encoder for '{}'",
                                spec.column
                            ))
                        })?;
                    feature_names.extend(encoder.feature_names());
                }
                _ => feature_names.push(spec.column.clone()),
            }
        }

        Ok(Self {
            specs: specs.to_vec(),
            feature_names,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of output columns
    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    pub fn specs(&self) -> &[FeatureSpec] {
        &self.specs
    }

    /// Stack per-feature blocks into the output matrix.
    ///
    /// Blocks must arrive in declared order, each spanning `n_rows` rows.
    pub fn assemble(&self, n_rows: usize, blocks: Vec<FeatureBlock>) -> Result<Array2<f64>> {
        if blocks.len() != self.specs.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} feature blocks", self.specs.len()),
                actual: format!("{} feature blocks", blocks.len()),
            });
        }

        let width: usize = blocks.iter().map(|b| b.columns.len()).sum();
        if width != self.width() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} columns", self.width()),
                actual: format!("{} columns", width),
            });
        }

        let mut matrix = Array2::zeros((n_rows, width));
        let mut offset = 0;
        for (block, spec) in blocks.iter().zip(&self.specs) {
            if block.source != spec.column {
                return Err(ChurnError::PreprocessingError(format!(
                    "feature block '{}' out of order, expected '{}'",
                    block.source, spec.column
                )));
            }
            for values in &block.columns {
                if values.len() != n_rows {
                    return Err(ChurnError::ShapeError {
                        expected: format!("{} rows in '{}'", n_rows, block.source),
                        actual: format!("{} rows", values.len()),
                    });
                }
                for (row, value) in values.iter().enumerate() {
                    matrix[[row, offset]] = *value;
                }
                offset += 1;
            }
        }

        Ok(matrix)
    }
}

/// Transformed output columns of one declared feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBlock {
    pub source: String,
    pub columns: Vec<Vec<f64>>,
}

impl FeatureBlock {
    pub fn single(source: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            source: source.into(),
            columns: vec![values],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn layout() -> FeatureLayout {
        let df = df!("geo" => &["b", "a"]).unwrap();
        let mut encoder = OneHotEncoder::new("geo");
        encoder.fit(&df).unwrap();
        let specs = vec![
            FeatureSpec::new("x", FeatureKind::Numeric),
            FeatureSpec::new("geo", FeatureKind::OneHot),
            FeatureSpec::new("y", FeatureKind::MinMax),
        ];
        FeatureLayout::resolve(&specs, &[encoder]).unwrap()
    }

    #[test]
    fn test_one_hot_expands_in_place() {
        let layout = layout();
        assert_eq!(layout.feature_names(), &["x", "geo_a", "geo_b", "y"]);
        assert_eq!(layout.width(), 4);
    }

    #[test]
    fn test_assemble() {
        let layout = layout();
        let blocks = vec![
            FeatureBlock::single("x", vec![1.0, 2.0]),
            FeatureBlock {
                source: "geo".into(),
                columns: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            },
            FeatureBlock::single("y", vec![0.5, 0.25]),
        ];
        let matrix = layout.assemble(2, blocks).unwrap();
        assert_eq!(matrix.shape(), &[2, 4]);
        assert_eq!(matrix.row(0).to_vec(), vec![1.0, 0.0, 1.0, 0.5]);
        assert_eq!(matrix.row(1).to_vec(), vec![2.0, 1.0, 0.0, 0.25]);
    }

    #[test]
    fn test_assemble_rejects_wrong_width() {
        let layout = layout();
        let blocks = vec![
            FeatureBlock::single("x", vec![1.0]),
            FeatureBlock::single("geo", vec![1.0]),
            FeatureBlock::single("y", vec![0.5]),
        ];
        assert!(matches!(
            layout.assemble(1, blocks),
            Err(ChurnError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_missing_encoder_is_error() {
        let specs = vec![FeatureSpec::new("geo", FeatureKind::OneHot)];
        assert!(FeatureLayout::resolve(&specs, &[]).is_err());
    }
}
