//! Raw form values → model-ordered feature row.

use crate::errors::{PiRiskError, PiRiskResult};
use crate::feature_schema::{Feature, FeatureKind, FeatureSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A single value as entered in the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{n}"),
            RawValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

/// One submission, keyed by column name. Entry order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: BTreeMap<String, RawValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Urlencoded form posts carry every value as text; numeric fields are
    /// coerced later by the adapter.
    pub fn from_form(form: HashMap<String, String>) -> Self {
        Self {
            fields: form
                .into_iter()
                .map(|(k, v)| (k, RawValue::Text(v)))
                .collect(),
        }
    }
}

/// Exactly one row, one finite value per spec column, in spec order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    columns: Vec<Feature>,
    values: Vec<f64>,
}

impl FeatureRow {
    pub fn columns(&self) -> &[Feature] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|f| f.column_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.columns
            .iter()
            .position(|f| *f == feature)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        self.columns.iter().copied().zip(self.values.iter().copied())
    }

    /// Assemble a row from parts without going through the adapter. Used by
    /// callers that already hold model-ordered numbers; still rejects ragged or
    /// non-finite input.
    pub fn from_parts(columns: Vec<Feature>, values: Vec<f64>) -> PiRiskResult<Self> {
        if columns.len() != values.len() {
            return Err(PiRiskError::internal(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        if let Some((feature, value)) = columns
            .iter()
            .zip(values.iter())
            .find(|(_, v)| !v.is_finite())
        {
            return Err(PiRiskError::coercion(feature.column_name(), value.to_string()));
        }
        Ok(Self { columns, values })
    }
}

/// Map a raw submission onto the `FeatureSpec` columns.
///
/// Walks the feature spec (never the input) so the output order is spec order no
/// matter how the caller arranged its fields.
pub fn build_feature_row(raw: &RawInput, spec: &FeatureSpec) -> PiRiskResult<FeatureRow> {
    if let Some(extra) = raw.names().find(|name| !spec.contains_name(name)) {
        return Err(PiRiskError::unknown_field(extra));
    }

    let mut columns = Vec::with_capacity(spec.len());
    let mut values = Vec::with_capacity(spec.len());

    for feature in spec.iter() {
        let name = feature.column_name();
        let value = raw
            .get(name)
            .ok_or_else(|| PiRiskError::missing_field(name))?;

        let encoded = match feature.kind() {
            FeatureKind::BooleanCategorical => encode_categorical(name, value)?,
            FeatureKind::ContinuousNumeric { .. } => coerce_numeric(name, value)?,
        };

        columns.push(feature);
        values.push(encoded);
    }

    Ok(FeatureRow { columns, values })
}

fn encode_categorical(name: &str, value: &RawValue) -> PiRiskResult<f64> {
    match value {
        RawValue::Text(s) if s == "Yes" => Ok(1.0),
        RawValue::Text(s) if s == "No" => Ok(0.0),
        other => Err(PiRiskError::schema_violation(name, other.to_string())),
    }
}

fn coerce_numeric(name: &str, value: &RawValue) -> PiRiskResult<f64> {
    let parsed = match value {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(s) => s.trim().parse::<f64>().ok(),
    };

    match parsed {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(PiRiskError::coercion(name, value.to_string())),
    }
}
