//! Single customer record scored by the serving path

use super::columns;
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

/// Countries the service accepts
pub const GEOGRAPHIES: [&str; 3] = ["France", "Germany", "Spain"];

/// Genders the service accepts
pub const GENDERS: [&str; 2] = ["Male", "Female"];

/// Accepted closed range of each numeric field
pub const NUMERIC_BOUNDS: [(&str, f64, f64); 6] = [
    (columns::CREDIT_SCORE, 0.0, 1000.0),
    (columns::AGE, 0.0, 100.0),
    (columns::TENURE, 0.0, 100.0),
    (columns::BALANCE, 0.0, f64::MAX),
    (columns::NUM_OF_PRODUCTS, 0.0, 10.0),
    (columns::ESTIMATED_SALARY, 0.0, 1_000_000.0),
];

/// Range of a numeric field, `None` for non-numeric columns
pub fn numeric_bounds(column: &str) -> Option<(f64, f64)> {
    NUMERIC_BOUNDS
        .iter()
        .find(|(name, _, _)| *name == column)
        .map(|(_, min, max)| (*min, *max))
}

/// Raw field values for one customer, as gathered by the input form.
///
/// Field names serialize to the dataset's column names so a record can be
/// read from the same JSON a client would post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "CreditScore")]
    pub credit_score: f64,
    #[serde(rename = "Geography")]
    pub geography: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Tenure")]
    pub tenure: f64,
    #[serde(rename = "Balance")]
    pub balance: f64,
    #[serde(rename = "NumOfProducts")]
    pub num_of_products: f64,
    #[serde(rename = "HasCrCard", deserialize_with = "deserialize_flag")]
    pub has_cr_card: bool,
    #[serde(rename = "IsActiveMember", deserialize_with = "deserialize_flag")]
    pub is_active_member: bool,
    #[serde(rename = "EstimatedSalary")]
    pub estimated_salary: f64,
}

impl RawRecord {
    /// Parse a record from JSON; missing or malformed fields are validation errors
    pub fn from_json(json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json)
            .map_err(|e| ChurnError::ValidationError(format!("malformed record: {}", e)))?;
        record.validate()?;
        Ok(record)
    }

    /// Check every field against its declared domain
    pub fn validate(&self) -> Result<()> {
        let numeric = [
            self.credit_score,
            self.age,
            self.tenure,
            self.balance,
            self.num_of_products,
            self.estimated_salary,
        ];
        for ((column, min, max), value) in NUMERIC_BOUNDS.iter().zip(numeric) {
            check_range(column, value, *min, *max)?;
        }
        check_domain(columns::GEOGRAPHY, &self.geography, &GEOGRAPHIES)?;
        check_domain(columns::GENDER, &self.gender, &GENDERS)?;
        Ok(())
    }

    /// One-row frame with the dataset's column names and dtypes.
    ///
    /// Flags become 1.0/0.0 like the numeric flag columns of the training file.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        DataFrame::new(vec![
            Column::new(columns::CREDIT_SCORE.into(), &[self.credit_score]),
            Column::new(columns::GEOGRAPHY.into(), &[self.geography.as_str()]),
            Column::new(columns::GENDER.into(), &[self.gender.as_str()]),
            Column::new(columns::AGE.into(), &[self.age]),
            Column::new(columns::TENURE.into(), &[self.tenure]),
            Column::new(columns::BALANCE.into(), &[self.balance]),
            Column::new(columns::NUM_OF_PRODUCTS.into(), &[self.num_of_products]),
            Column::new(columns::HAS_CR_CARD.into(), &[flag(self.has_cr_card)]),
            Column::new(columns::IS_ACTIVE_MEMBER.into(), &[flag(self.is_active_member)]),
            Column::new(columns::ESTIMATED_SALARY.into(), &[self.estimated_salary]),
        ])
        .map_err(|e| ChurnError::DataError(e.to_string()))
    }
}

/// Parse a yes/no flag: `Yes`/`No`, `true`/`false` or `1`/`0` (case-insensitive)
pub fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        other => Err(ChurnError::ValidationError(format!(
            "'{}' is not a yes/no value",
            other
        ))),
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Number(n) if n == 1.0 => Ok(true),
        Flag::Number(n) if n == 0.0 => Ok(false),
        Flag::Number(n) => Err(serde::de::Error::custom(format!("{} is not 0 or 1", n))),
        Flag::Text(s) => parse_flag(&s).map_err(serde::de::Error::custom),
    }
}

fn check_range(column: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ChurnError::ValidationError(format!(
            "{} = {} is outside [{}, {}]",
            column, value, min, max
        )));
    }
    Ok(())
}

fn check_domain(column: &str, value: &str, domain: &[&str]) -> Result<()> {
    if !domain.contains(&value) {
        return Err(ChurnError::ValidationError(format!(
            "{} = '{}' is not one of {:?}",
            column, value, domain
        )));
    }
    Ok(())
}
