// Runtime configuration for the pirisk service.
// Loaded once at startup (see config_loader) and read-only afterwards.

use crate::feature_adapter::{RawInput, RawValue};
use crate::feature_schema::{Feature, FeatureSpec};
use crate::prediction::DEFAULT_DECISION_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// XGBoost JSON model written by `save_model`
    pub model_path: String,
    #[serde(default = "default_threshold")]
    pub decision_threshold: f64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub defaults: FormDefaults,
}

fn default_threshold() -> f64 {
    DEFAULT_DECISION_THRESHOLD
}

fn default_log_filter() -> String {
    "info,tower_http=info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: "xgb_model.json".to_string(),
            decision_threshold: default_threshold(),
            log_filter: default_log_filter(),
            server: ServerConfig::default(),
            defaults: FormDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Checks figment cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_path.trim().is_empty() {
            return Err("model_path must be set".into());
        }
        if !(self.decision_threshold > 0.0 && self.decision_threshold < 1.0) {
            return Err(format!(
                "decision_threshold must be in (0, 1), got {}",
                self.decision_threshold
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err("server.host cannot be empty".into());
        }
        self.defaults.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Answer for a Yes/No form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Yes,
    No,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Yes => "Yes",
            Choice::No => "No",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values the form is prefilled with.
///
/// Two earlier revisions of the form disagreed on these, so they are plain
/// configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    pub days_in_icu: u32,
    pub department_transfer: Choice,
    pub consciousness: Choice,
    pub glucose: f64,
    pub neutrophil_count: f64,
    pub serum_albumin: f64,
    pub sedatives: Choice,
    pub warming_blanket: Choice,
    pub mechanical_ventilation: Choice,
    pub smoking_history: Choice,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            days_in_icu: 3,
            department_transfer: Choice::Yes,
            consciousness: Choice::Yes,
            glucose: 5.0,
            neutrophil_count: 4.0,
            serum_albumin: 35.0,
            sedatives: Choice::Yes,
            warming_blanket: Choice::Yes,
            mechanical_ventilation: Choice::Yes,
            smoking_history: Choice::Yes,
        }
    }
}

impl FormDefaults {
    pub fn value(&self, feature: Feature) -> RawValue {
        match feature {
            Feature::DepartmentTransfer => self.department_transfer.as_str().into(),
            Feature::Consciousness => self.consciousness.as_str().into(),
            Feature::MechanicalVentilation => self.mechanical_ventilation.as_str().into(),
            Feature::Sedatives => self.sedatives.as_str().into(),
            Feature::WarmingBlanket => self.warming_blanket.as_str().into(),
            Feature::SmokingHistory => self.smoking_history.as_str().into(),
            Feature::DaysInIcu => RawValue::Number(f64::from(self.days_in_icu)),
            Feature::SerumAlbumin => RawValue::Number(self.serum_albumin),
            Feature::NeutrophilCount => RawValue::Number(self.neutrophil_count),
            Feature::Glucose => RawValue::Number(self.glucose),
        }
    }

    /// Add a default for every `spec` field the submission leaves out. Values
    /// already present are kept as submitted.
    pub fn fill_missing(&self, raw: &mut RawInput, spec: &FeatureSpec) {
        for feature in spec.iter() {
            let name = feature.column_name();
            if raw.get(name).is_none() {
                raw.insert(name, self.value(feature));
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("glucose", self.glucose),
            ("neutrophil_count", self.neutrophil_count),
            ("serum_albumin", self.serum_albumin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("defaults.{name} must be a non-negative number"));
            }
        }
        Ok(())
    }
}
