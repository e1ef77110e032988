//! churnpipe - Customer churn prediction
//!
//! One feature pipeline whose state is fitted once on the training partition,
//! frozen to disk, and replayed unchanged when scoring a single customer.
//!
//! # Modules
//!
//! - [`data`] - CSV loading, label separation, column pruning, the train/test split
//!   and the raw serving record
//! - [`preprocessing`] - Imputation, binary and one-hot encoding, robust and
//!   min-max scaling, feature assembly
//! - [`training`] - Gradient boosted tree classifier, evaluation metrics and
//!   the training workflow
//! - [`export`] - Schema-versioned artifact persistence
//! - [`inference`] - Serving engine over the frozen pipeline
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod data;
pub mod preprocessing;
pub mod training;
pub mod export;
pub mod inference;

// Interface
pub mod cli;

pub use error::{ChurnError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::data::{ChurnDataset, DataLoader, RawRecord};
    pub use crate::error::{ChurnError, Result};
    pub use crate::export::ArtifactStore;
    pub use crate::inference::{InferenceConfig, InferenceEngine, Prediction, Verdict};
    pub use crate::preprocessing::{
        ChurnPreprocessor, FeatureKind, FeatureSpec, PreprocessingConfig, UnknownCategoryPolicy,
    };
    pub use crate::training::{
        Model, ModelMetrics, TrainEngine, TrainedModel, TrainingConfig, TrainingOutcome,
        XGBoostConfig,
    };
}
