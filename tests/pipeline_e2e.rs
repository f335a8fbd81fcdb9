//! End-to-end tests for the scoring pipeline
//!
//! Drives the shipped fixture model through the full submission path:
//! raw values, feature row, classification and attribution.

use pirisk::feature_adapter::{FeatureRow, RawInput};
use pirisk::feature_schema::{Feature, FeatureSpec};
use pirisk::model_artifact::ModelArtifact;
use pirisk::prediction::sigmoid;
use pirisk::{PiRiskError, Pipeline};
use std::path::PathBuf;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pressure_injury_xgb.json")
}

fn pipeline() -> Pipeline {
    let artifact = ModelArtifact::load(fixture_path()).expect("fixture model should load");
    Pipeline::new(artifact, 0.5).expect("pipeline init")
}

fn scenario() -> RawInput {
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

#[test]
fn scenario_scores_low_risk() {
    let assessment = pipeline().assess(&scenario()).expect("scenario should score");

    assert_eq!(
        assessment.features.values(),
        &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 35.0, 4.0, 5.0]
    );
    assert!((assessment.prediction.margin - (-0.58)).abs() < 1e-9);
    assert!((assessment.prediction.probability - sigmoid(-0.58)).abs() < 1e-12);
    assert_eq!(assessment.prediction.label, 0);
    assert_eq!(assessment.attribution.contributions.len(), 10);

    // Attributions explain the margin exactly.
    let explained = assessment.attribution.output_value();
    assert!((explained - assessment.prediction.margin).abs() < 1e-9);
}

#[test]
fn high_risk_patient_is_flagged() {
    let raw = scenario()
        .with("Days_in_ICU", 20i64)
        .with("Consciousness", "Yes")
        .with("Mechanical_Ventilation", "Yes")
        .with("Sedatives", "Yes")
        .with("Serum_Albumin", 25.0)
        .with("Glucose", 15.0)
        .with("Neutrophil_Count", 12.0);

    let assessment = pipeline().assess(&raw).unwrap();
    assert!((assessment.prediction.margin - 1.63).abs() < 1e-9);
    assert_eq!(assessment.prediction.label, 1);
    assert!(assessment.prediction.probability > 0.8);

    let top = &assessment.attribution.ranked()[0];
    assert_eq!(top.feature, Feature::DaysInIcu);
    assert!(top.shap > 0.0);
}

#[test]
fn repeated_submissions_are_deterministic() {
    let p = pipeline();
    let a = p.assess(&scenario()).unwrap();
    let b = p.assess(&scenario()).unwrap();

    assert_eq!(a.features, b.features);
    assert_eq!(a.prediction, b.prediction);
    assert_eq!(a.attribution, b.attribution);
    assert_ne!(a.request_id, b.request_id);
}

#[test]
fn non_numeric_glucose_is_rejected_before_scoring() {
    let raw = scenario().with("Glucose", "abc");
    let err = pipeline().assess(&raw).unwrap_err();

    assert!(matches!(err, PiRiskError::Coercion { ref field, .. } if field == "Glucose"));
    assert!(err.is_input_error());
}

#[test]
fn boundary_values_are_accepted() {
    let raw = scenario()
        .with("Days_in_ICU", 0i64)
        .with("Glucose", 1_000_000.0);
    let assessment = pipeline().assess(&raw).expect("boundary values should score");
    assert_eq!(assessment.features.get(Feature::DaysInIcu), Some(0.0));
    assert_eq!(assessment.features.get(Feature::Glucose), Some(1_000_000.0));
}

#[test]
fn field_order_of_the_submission_does_not_matter() {
    let json_a = r#"{"Glucose": 5, "Days_in_ICU": 3, "Department_Transfer": "Yes",
        "Consciousness": "No", "Neutrophil_Count": 4, "Serum_Albumin": 35,
        "Sedatives": "No", "Warming_Blanket": "No", "Mechanical_Ventilation": "No",
        "Smoking_History": "No"}"#;
    let raw: RawInput = serde_json::from_str(json_a).unwrap();

    let p = pipeline();
    assert_eq!(
        p.build_row(&raw).unwrap(),
        p.build_row(&scenario()).unwrap()
    );
}

#[test]
fn misaligned_row_never_reaches_the_model() {
    let mut columns: Vec<Feature> = FeatureSpec::canonical().features().to_vec();
    columns.swap(6, 9);
    let row = FeatureRow::from_parts(columns, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 35.0, 4.0, 3.0])
        .unwrap();

    let p = pipeline();
    let err = p.classify(&row).unwrap_err();
    assert!(matches!(err, PiRiskError::SchemaMismatch { .. }));
    let err = p.explain(&row).unwrap_err();
    assert!(matches!(err, PiRiskError::SchemaMismatch { .. }));
}

#[test]
fn missing_model_file_is_a_load_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let err = ModelArtifact::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, PiRiskError::ModelLoad { .. }));
}

#[test]
fn corrupt_model_file_is_a_load_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("model.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = ModelArtifact::load(&path).unwrap_err();
    assert!(matches!(err, PiRiskError::ModelLoad { .. }));
}
