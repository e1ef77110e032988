//! Serving module
//!
//! An immutable [`InferenceEngine`] built once from persisted artifacts scores
//! raw customer records through the same frozen transform the training run used.

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{InferenceEngine, Prediction, Verdict};
