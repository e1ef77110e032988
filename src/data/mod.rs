//! Raw data handling
//!
//! - [`DataLoader`] reads the delimited customer dataset into a polars `DataFrame`
//! - [`ChurnDataset`] separates inputs from labels, prunes columns and partitions rows
//! - [`RawRecord`] is the single customer record the serving path scores

mod dataset;
mod loader;
mod record;

pub use dataset::{ChurnDataset, Partition};
pub use loader::DataLoader;
pub use record::{numeric_bounds, parse_flag, RawRecord, GENDERS, GEOGRAPHIES, NUMERIC_BOUNDS};

/// Column names of the customer dataset.
pub mod columns {
    pub const CREDIT_SCORE: &str = "CreditScore";
    pub const GEOGRAPHY: &str = "Geography";
    pub const GENDER: &str = "Gender";
    pub const AGE: &str = "Age";
    pub const TENURE: &str = "Tenure";
    pub const BALANCE: &str = "Balance";
    pub const NUM_OF_PRODUCTS: &str = "NumOfProducts";
    pub const HAS_CR_CARD: &str = "HasCrCard";
    pub const IS_ACTIVE_MEMBER: &str = "IsActiveMember";
    pub const ESTIMATED_SALARY: &str = "EstimatedSalary";

    /// Default label column
    pub const EXITED: &str = "Exited";

    /// Identifier and free-text columns that never reach the encoders
    pub const IDENTIFIERS: [&str; 5] = ["Unnamed: 0", "id", "RowNumber", "CustomerId", "Surname"];
}
