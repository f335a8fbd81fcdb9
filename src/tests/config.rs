// src/tests/config.rs
use crate::config::{AppConfig, Choice, FormDefaults};
use crate::config_loader::load_config;
use crate::feature_adapter::{build_feature_row, RawInput, RawValue};
use crate::feature_schema::{Feature, FeatureSpec};
use figment::Jail;

#[test]
fn defaults_load_without_a_file() {
    Jail::expect_with(|_jail| {
        let cfg = load_config(None)?;
        assert_eq!(cfg.model_path, "xgb_model.json");
        assert_eq!(cfg.decision_threshold, 0.5);
        assert_eq!(cfg.server.port, 8501);
        assert_eq!(cfg.defaults.days_in_icu, 3);
        assert_eq!(cfg.defaults.serum_albumin, 35.0);
        assert_eq!(cfg.defaults.sedatives, Choice::Yes);
        Ok(())
    });
}

#[test]
fn toml_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "pirisk.toml",
            r#"
            model_path = "models/pi.json"

            [server]
            port = 9000

            [defaults]
            glucose = 6.5
            smoking_history = "No"
            "#,
        )?;

        let cfg = load_config(None)?;
        assert_eq!(cfg.model_path, "models/pi.json");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.defaults.glucose, 6.5);
        assert_eq!(cfg.defaults.smoking_history, Choice::No);
        assert_eq!(cfg.defaults.neutrophil_count, 4.0);
        Ok(())
    });
}

#[test]
fn env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "model_path = \"from_file.json\"")?;
        jail.set_env("PIRISK_MODEL_PATH", "from_env.json");
        jail.set_env("PIRISK_SERVER__PORT", "7000");
        jail.set_env("PIRISK_DEFAULTS__DAYS_IN_ICU", "0");

        let cfg = load_config(Some("custom.toml"))?;
        assert_eq!(cfg.model_path, "from_env.json");
        assert_eq!(cfg.server.port, 7000);
        assert_eq!(cfg.defaults.days_in_icu, 0);
        Ok(())
    });
}

#[test]
fn explicit_missing_file_fails_fast() {
    Jail::expect_with(|_jail| {
        let err = load_config(Some("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
        Ok(())
    });
}

#[test]
fn out_of_range_threshold_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("PIRISK_DECISION_THRESHOLD", "1.5");
        let err = load_config(None).unwrap_err();
        assert!(err.to_string().contains("decision_threshold"));
        Ok(())
    });
}

#[test]
fn negative_default_is_rejected() {
    let mut cfg = AppConfig::default();
    cfg.defaults.glucose = -1.0;
    assert!(cfg.validate().unwrap_err().contains("defaults.glucose"));
}

#[test]
fn default_submission_is_a_valid_row() {
    let spec = FeatureSpec::canonical();
    let mut raw = RawInput::new();
    FormDefaults::default().fill_missing(&mut raw, &spec);
    assert_eq!(raw.len(), spec.len());

    let row = build_feature_row(&raw, &spec).expect("defaults should build a row");
    assert_eq!(
        row.values(),
        &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 3.0, 35.0, 4.0, 5.0]
    );
}

#[test]
fn fill_missing_keeps_submitted_values() {
    let spec = FeatureSpec::canonical();
    let defaults = FormDefaults {
        smoking_history: Choice::No,
        ..FormDefaults::default()
    };
    let mut raw = RawInput::new()
        .with("Glucose", 9.5)
        .with("Sedatives", "No");

    defaults.fill_missing(&mut raw, &spec);

    assert_eq!(raw.len(), spec.len());
    assert_eq!(raw.get("Glucose"), Some(&RawValue::Number(9.5)));
    assert_eq!(raw.get("Sedatives"), Some(&RawValue::Text("No".into())));
    assert_eq!(raw.get("Smoking_History"), Some(&RawValue::Text("No".into())));

    let row = build_feature_row(&raw, &spec).unwrap();
    assert_eq!(row.get(Feature::Glucose), Some(9.5));
    assert_eq!(row.get(Feature::DaysInIcu), Some(3.0));
}
