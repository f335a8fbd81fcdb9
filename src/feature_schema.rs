//! Feature schema - the ordered column layout the classifier was fit on.
//!
//! The model scores rows positionally. A row whose columns are in a different
//! order than the trees were trained on produces a plausible but wrong
//! probability, so every row is built from a `FeatureSpec` and checked against
//! the artifact's own names before it is scored.

use crate::errors::{PiRiskError, PiRiskResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// How a raw form value is turned into a model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    /// "Yes" → 1, "No" → 0
    BooleanCategorical,
    /// Any finite number; `integral` marks day counts
    ContinuousNumeric { integral: bool },
}

/// The clinical inputs known to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "Department_Transfer")]
    DepartmentTransfer,
    #[serde(rename = "Consciousness")]
    Consciousness,
    #[serde(rename = "Mechanical_Ventilation")]
    MechanicalVentilation,
    #[serde(rename = "Sedatives")]
    Sedatives,
    #[serde(rename = "Warming_Blanket")]
    WarmingBlanket,
    #[serde(rename = "Smoking_History")]
    SmokingHistory,
    #[serde(rename = "Days_in_ICU")]
    DaysInIcu,
    #[serde(rename = "Serum_Albumin")]
    SerumAlbumin,
    #[serde(rename = "Neutrophil_Count")]
    NeutrophilCount,
    #[serde(rename = "Glucose")]
    Glucose,
}

impl Feature {
    /// All features in the order the shipped model was trained on.
    pub const ALL: [Feature; 10] = [
        Feature::DepartmentTransfer,
        Feature::Consciousness,
        Feature::MechanicalVentilation,
        Feature::Sedatives,
        Feature::WarmingBlanket,
        Feature::SmokingHistory,
        Feature::DaysInIcu,
        Feature::SerumAlbumin,
        Feature::NeutrophilCount,
        Feature::Glucose,
    ];

    /// Column name as stored in the model artifact and used in requests.
    pub fn column_name(&self) -> &'static str {
        match self {
            Feature::DepartmentTransfer => "Department_Transfer",
            Feature::Consciousness => "Consciousness",
            Feature::MechanicalVentilation => "Mechanical_Ventilation",
            Feature::Sedatives => "Sedatives",
            Feature::WarmingBlanket => "Warming_Blanket",
            Feature::SmokingHistory => "Smoking_History",
            Feature::DaysInIcu => "Days_in_ICU",
            Feature::SerumAlbumin => "Serum_Albumin",
            Feature::NeutrophilCount => "Neutrophil_Count",
            Feature::Glucose => "Glucose",
        }
    }

    /// Form label shown next to the input widget.
    pub fn label(&self) -> &'static str {
        match self {
            Feature::DepartmentTransfer => "Department Transfer",
            Feature::Consciousness => "Consciousness (coma)",
            Feature::MechanicalVentilation => "Mechanical Ventilation",
            Feature::Sedatives => "Sedatives Used",
            Feature::WarmingBlanket => "Warming Blanket",
            Feature::SmokingHistory => "Smoking History",
            Feature::DaysInIcu => "Days in ICU (days)",
            Feature::SerumAlbumin => "Serum Albumin (g/dL)",
            Feature::NeutrophilCount => "Neutrophil Count (*10^9/L)",
            Feature::Glucose => "Glucose (mg/dL)",
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::DepartmentTransfer
            | Feature::Consciousness
            | Feature::MechanicalVentilation
            | Feature::Sedatives
            | Feature::WarmingBlanket
            | Feature::SmokingHistory => FeatureKind::BooleanCategorical,
            Feature::DaysInIcu => FeatureKind::ContinuousNumeric { integral: true },
            Feature::SerumAlbumin | Feature::NeutrophilCount | Feature::Glucose => {
                FeatureKind::ContinuousNumeric { integral: false }
            }
        }
    }

    pub fn is_categorical(&self) -> bool {
        self.kind() == FeatureKind::BooleanCategorical
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.column_name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Ordered model input schema. Fixed once the artifact is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    features: Vec<Feature>,
}

impl FeatureSpec {
    /// Layout of the shipped pressure-injury model.
    pub fn canonical() -> Self {
        Self {
            features: Feature::ALL.to_vec(),
        }
    }

    /// Build a spec from the feature names recorded in a model artifact.
    ///
    /// Every name must be a known feature and appear once; anything else means
    /// the artifact was fit on a different table and is rejected outright.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> PiRiskResult<Self> {
        let mut features = Vec::with_capacity(names.len());
        let mut offending = Vec::new();

        for name in names {
            let name = name.as_ref();
            match Feature::from_name(name) {
                Some(feature) if !features.contains(&feature) => features.push(feature),
                Some(_) => offending.push(format!("{name} (duplicate)")),
                None => offending.push(format!("{name} (unknown)")),
            }
        }

        if !offending.is_empty() {
            return Err(PiRiskError::SchemaMismatch {
                expected: Self::canonical().names().join(", "),
                actual: names
                    .iter()
                    .map(|n| n.as_ref())
                    .collect::<Vec<_>>()
                    .join(", "),
                columns: offending.join(", "),
            });
        }

        if features.is_empty() {
            return Err(PiRiskError::config("feature spec cannot be empty"));
        }

        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.features.iter().copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.column_name()).collect()
    }

    pub fn position(&self, feature: Feature) -> Option<usize> {
        self.features.iter().position(|f| *f == feature)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        Feature::from_name(name).is_some_and(|f| self.features.contains(&f))
    }

    /// SHA-256 over the ordered column names, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for name in self.names() {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    pub fn info(&self) -> SpecInfo {
        SpecInfo {
            fingerprint: self.fingerprint(),
            feature_count: self.len(),
            features: self
                .iter()
                .map(|f| FieldInfo {
                    name: f.column_name().to_string(),
                    label: f.label().to_string(),
                    kind: f.kind(),
                })
                .collect(),
        }
    }
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Serializable description of a spec for the schema endpoint and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecInfo {
    pub fingerprint: String,
    pub feature_count: usize,
    pub features: Vec<FieldInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
}
