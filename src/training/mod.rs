//! Model training module
//!
//! - [`XGBoostClassifier`]: second-order gradient boosted trees with logistic loss
//! - [`TrainEngine`]: prune → split → fit features → fit classifier → evaluate
//! - [`ModelMetrics`] and [`ClassificationReport`] for held-out evaluation

mod config;
mod engine;
mod models;
pub mod xgboost;

pub use config::TrainingConfig;
pub use engine::{SplitSizes, TrainEngine, TrainedModel, TrainingOutcome};
pub use models::{ClassMetrics, ClassificationReport, ConfusionMatrix, Model, ModelMetrics};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};
