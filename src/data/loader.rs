//! Delimited-file loading

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Data loader for the customer dataset
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator
    delimiter: u8,
    /// Rows scanned to infer column dtypes (None = whole file)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new comma-separated loader
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: Some(10_000),
        }
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set how many rows are scanned for dtype inference
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a delimited file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::DataError(format!(
                "dataset not found: {}",
                path.display()
            )));
        }

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| ChurnError::DataError(e.to_string()))?
            .finish()
            .map_err(|e| ChurnError::DataError(e.to_string()))?;

        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            "Loaded dataset"
        );

        Ok(df)
    }

    /// Parse a delimiter argument such as `,`, `;` or `\t`
    pub fn parse_delimiter(raw: &str) -> Result<u8> {
        match raw {
            "\\t" | "tab" => Ok(b'\t'),
            s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
            other => Err(ChurnError::InvalidParameter {
                name: "delimiter".to_string(),
                value: other.to_string(),
                reason: "must be a single ASCII character".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_csv(delimiter: char) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let d = delimiter;
        writeln!(file, "CreditScore{d}Geography{d}Exited").unwrap();
        writeln!(file, "619{d}France{d}1").unwrap();
        writeln!(file, "{d}Spain{d}0").unwrap();
        writeln!(file, "502{d}Germany{d}1").unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv(',');
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        // empty numeric field is read as null
        assert_eq!(df.column("CreditScore").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_csv_custom_delimiter() {
        let file = create_test_csv(';');
        let df = DataLoader::new()
            .with_delimiter(b';')
            .load_csv(file.path())
            .unwrap();
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_missing_file() {
        let result = DataLoader::new().load_csv("/nonexistent/churn.csv");
        assert!(matches!(result, Err(ChurnError::DataError(_))));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(DataLoader::parse_delimiter(",").unwrap(), b',');
        assert_eq!(DataLoader::parse_delimiter("\\t").unwrap(), b'\t');
        assert!(DataLoader::parse_delimiter(";;").is_err());
    }
}
