//! Library root for the `pirisk` crate
//! ICU pressure-injury risk: form input → XGBoost score → TreeSHAP attributions

// Core error handling
pub mod api_errors;
pub mod errors;

// Feature schema and input adaptation
pub mod feature_adapter;
pub mod feature_schema;
pub mod input_validator;

// Model artifact, prediction and explanation
pub mod explanation;
pub mod model_artifact;
pub mod prediction;
pub mod tree_shap;

// Per-submission pipeline
pub mod pipeline;

// Configuration & CLI
pub mod cli;
pub mod config;
pub mod config_loader;

// Web server interface
pub mod app_state;
pub mod render;
pub mod web;

// Logging
pub mod telemetry;


pub use errors::{PiRiskError, PiRiskResult};
pub use explanation::{AttributionResult, Contribution, Explainer};
pub use feature_adapter::{build_feature_row, FeatureRow, RawInput, RawValue};
pub use feature_schema::{Feature, FeatureKind, FeatureSpec};
pub use model_artifact::ModelArtifact;
pub use pipeline::{Assessment, Pipeline};
pub use prediction::{PredictionResult, Predictor};
