//! Labelled dataset: target extraction, column pruning and train/test partitioning

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Axis};
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

/// Raw input columns plus the 0/1 churn label of every row
#[derive(Debug, Clone)]
pub struct ChurnDataset {
    inputs: DataFrame,
    labels: Array1<f64>,
}

/// Disjoint train/test partition of a [`ChurnDataset`]
#[derive(Debug, Clone)]
pub struct Partition {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    /// Row positions (in the source dataset) of the training rows
    pub train_indices: Vec<usize>,
    /// Row positions (in the source dataset) of the test rows
    pub test_indices: Vec<usize>,
}

impl ChurnDataset {
    /// Pair inputs with labels; both must have the same number of rows
    pub fn new(inputs: DataFrame, labels: Array1<f64>) -> Result<Self> {
        if inputs.height() != labels.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} labels", inputs.height()),
                actual: format!("{} labels", labels.len()),
            });
        }
        Ok(Self { inputs, labels })
    }

    /// Split a raw frame into inputs and the `target` label column.
    ///
    /// Labels must be 0 or 1 with no nulls.
    pub fn from_frame(df: &DataFrame, target: &str) -> Result<Self> {
        let column = df
            .column(target)
            .map_err(|_| ChurnError::FeatureNotFound(target.to_string()))?;

        let target_f64 = column
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|e| ChurnError::DataError(e.to_string()))?;

        let labels = target_f64
            .f64()
            .map_err(|e| ChurnError::DataError(e.to_string()))?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(label) if label == 0.0 || label == 1.0 => Ok(label),
                Some(label) => Err(ChurnError::DataError(format!(
                    "label '{}' in row {} is not 0 or 1",
                    label, row
                ))),
                None => Err(ChurnError::DataError(format!(
                    "missing label in row {}",
                    row
                ))),
            })
            .collect::<Result<Array1<f64>>>()?;

        let inputs = df
            .drop(target)
            .map_err(|e| ChurnError::DataError(e.to_string()))?;

        Self::new(inputs, labels)
    }

    /// Remove the named columns; names that are not present are ignored.
    ///
    /// Returns the names that were actually removed.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for name in names {
            let name = name.as_ref();
            if self.inputs.get_column_index(name).is_none() {
                continue;
            }
            self.inputs
                .drop_in_place(name)
                .map_err(|e| ChurnError::DataError(e.to_string()))?;
            debug!(column = name, "Dropped column");
            removed.push(name.to_string());
        }
        Ok(removed)
    }

    /// Partition rows into train/test with a seeded shuffle.
    ///
    /// `ceil(n * test_size)` rows go to the test side. Inputs and labels are
    /// gathered with the same index selection.
    pub fn split(&self, test_size: f64, seed: u64) -> Result<Partition> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(ChurnError::InvalidParameter {
                name: "test_size".to_string(),
                value: test_size.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }

        let n = self.len();
        let n_test = ((n as f64) * test_size).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(ChurnError::ValidationError(format!(
                "cannot split {} rows with test_size {}: one side would be empty",
                n, test_size
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let test_indices = indices[..n_test].to_vec();
        let train_indices = indices[n_test..].to_vec();

        debug!(
            train = train_indices.len(),
            test = test_indices.len(),
            seed,
            "Partitioned dataset"
        );

        Ok(Partition {
            x_train: take_rows(&self.inputs, &train_indices)?,
            x_test: take_rows(&self.inputs, &test_indices)?,
            y_train: self.labels.select(Axis(0), &train_indices),
            y_test: self.labels.select(Axis(0), &test_indices),
            train_indices,
            test_indices,
        })
    }

    /// Input columns
    pub fn inputs(&self) -> &DataFrame {
        &self.inputs
    }

    /// 0/1 labels
    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Fraction of rows labelled churn
    pub fn churn_rate(&self) -> f64 {
        self.labels.mean().unwrap_or(0.0)
    }
}

fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    df.take(&idx).map_err(|e| ChurnError::DataError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_frame() -> DataFrame {
        df!(
            "RowNumber" => &[1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            "Surname" => &["Hargrave", "Hill", "Onio", "Boni", "Mitchell", "Chu", "Bartlett", "Obinna", "He", "H?"],
            "Age" => &[42.0, 41.0, 42.0, 39.0, 43.0, 44.0, 50.0, 29.0, 44.0, 27.0],
            "Exited" => &[1i64, 0, 1, 0, 0, 1, 0, 1, 0, 0],
        )
        .unwrap()
    }

    #[test]
    fn test_from_frame_separates_target() {
        let ds = ChurnDataset::from_frame(&create_test_frame(), "Exited").unwrap();
        assert_eq!(ds.len(), 10);
        assert!(ds.inputs().column("Exited").is_err());
        assert_eq!(ds.labels()[0], 1.0);
        assert!((ds.churn_rate() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_from_frame_missing_target() {
        let result = ChurnDataset::from_frame(&create_test_frame(), "churn");
        assert!(matches!(result, Err(ChurnError::FeatureNotFound(_))));
    }

    #[test]
    fn test_from_frame_rejects_non_binary_labels() {
        let df = df!("Age" => &[1.0, 2.0], "Exited" => &[0i64, 2]).unwrap();
        assert!(matches!(
            ChurnDataset::from_frame(&df, "Exited"),
            Err(ChurnError::DataError(_))
        ));
    }

    #[test]
    fn test_drop_columns_ignores_absent() {
        let mut ds = ChurnDataset::from_frame(&create_test_frame(), "Exited").unwrap();
        let removed = ds.drop_columns(&["RowNumber", "CustomerId", "Surname"]).unwrap();
        assert_eq!(removed, vec!["RowNumber".to_string(), "Surname".to_string()]);
        assert_eq!(ds.inputs().width(), 1);

        // second pass is a no-op
        let before = ds.inputs().clone();
        let removed = ds.drop_columns(&["RowNumber", "CustomerId"]).unwrap();
        assert!(removed.is_empty());
        assert!(ds.inputs().equals(&before));
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let ds = ChurnDataset::from_frame(&create_test_frame(), "Exited").unwrap();
        let p = ds.split(0.25, 42).unwrap();

        // ceil(10 * 0.25) = 3
        assert_eq!(p.test_indices.len(), 3);
        assert_eq!(p.train_indices.len(), 7);
        assert_eq!(p.x_test.height(), 3);
        assert_eq!(p.y_train.len(), 7);

        let mut all: Vec<usize> = p.train_indices.iter().chain(&p.test_indices).copied().collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_labels_follow_rows() {
        let ds = ChurnDataset::from_frame(&create_test_frame(), "Exited").unwrap();
        let p = ds.split(0.3, 7).unwrap();
        for (pos, &row) in p.test_indices.iter().enumerate() {
            assert_eq!(p.y_test[pos], ds.labels()[row]);
        }
    }

    #[test]
    fn test_split_invalid_fraction() {
        let ds = ChurnDataset::from_frame(&create_test_frame(), "Exited").unwrap();
        assert!(ds.split(0.0, 42).is_err());
        assert!(ds.split(1.0, 42).is_err());
        assert!(ds.split(0.99, 42).is_err());
    }
}
