//! Artifact persistence
//!
//! The frozen encoders, imputer, scalers, feature layout and classifier of a
//! training run are written as schema-versioned JSON files that the serving
//! path loads back verbatim.

mod store;

pub use store::{
    ArtifactStore, LayoutArtifact, Manifest, Versioned, ENCODERS_FILE, IMPUTERS_FILE,
    LAYOUT_FILE, MANIFEST_FILE, MODEL_FILE, SCALERS_FILE, SCHEMA_VERSION,
};
