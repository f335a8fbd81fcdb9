// src/tests/test_utils.rs
// Shared fixtures for the in-crate tests

use crate::feature_adapter::RawInput;
use crate::model_artifact::ModelArtifact;
use crate::pipeline::Pipeline;
use crate::prediction::DEFAULT_DECISION_THRESHOLD;
use std::path::PathBuf;

/// Five-tree binary:logistic model over the ten clinical columns.
pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pressure_injury_xgb.json")
}

pub fn load_fixture() -> ModelArtifact {
    ModelArtifact::load(fixture_path()).expect("fixture model should load")
}

pub fn fixture_pipeline() -> Pipeline {
    Pipeline::new(load_fixture(), DEFAULT_DECISION_THRESHOLD).expect("pipeline init")
}

/// Typical low-risk submission.
pub fn scenario_input() -> RawInput {
    RawInput::new()
        .with("Days_in_ICU", 3i64)
        .with("Department_Transfer", "Yes")
        .with("Consciousness", "No")
        .with("Glucose", 5.0)
        .with("Neutrophil_Count", 4.0)
        .with("Serum_Albumin", 35.0)
        .with("Sedatives", "No")
        .with("Warming_Blanket", "No")
        .with("Mechanical_Ventilation", "No")
        .with("Smoking_History", "No")
}

/// Long stay, comatose, ventilated, low albumin.
pub fn high_risk_input() -> RawInput {
    RawInput::new()
        .with("Days_in_ICU", 20i64)
        .with("Department_Transfer", "Yes")
        .with("Consciousness", "Yes")
        .with("Glucose", 15.0)
        .with("Neutrophil_Count", 12.0)
        .with("Serum_Albumin", 25.0)
        .with("Sedatives", "Yes")
        .with("Warming_Blanket", "Yes")
        .with("Mechanical_Ventilation", "Yes")
        .with("Smoking_History", "Yes")
}
