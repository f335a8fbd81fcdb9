use crate::errors::{PiRiskError, PiRiskResult};
use crate::feature_adapter::FeatureRow;
use crate::feature_schema::FeatureSpec;
use crate::model_artifact::ModelArtifact;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default cut-off used by `XGBClassifier.predict`
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 = pressure injury predicted
    pub label: u8,
    /// Positive-class probability
    pub probability: f64,
    /// Raw log-odds the probability was derived from
    pub margin: f64,
}

impl PredictionResult {
    pub fn is_positive(&self) -> bool {
        self.label == 1
    }
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Reject a row whose columns are not exactly the `FeatureSpec` columns, naming
/// every position that disagrees.
pub fn check_alignment(spec: &FeatureSpec, row: &FeatureRow) -> PiRiskResult<()> {
    let expected = spec.names();
    let actual = row.names();
    if expected == actual {
        return Ok(());
    }

    let width = expected.len().max(actual.len());
    let columns = (0..width)
        .filter_map(|i| {
            let e = expected.get(i).copied();
            let a = actual.get(i).copied();
            (e != a).then(|| {
                format!(
                    "#{i}: expected {} got {}",
                    e.unwrap_or("<none>"),
                    a.unwrap_or("<none>")
                )
            })
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(PiRiskError::SchemaMismatch {
        expected: expected.join(", "),
        actual: actual.join(", "),
        columns,
    })
}

/// Wraps the loaded classifier.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: Arc<ModelArtifact>,
    spec: FeatureSpec,
    threshold: f64,
}

impl Predictor {
    pub fn new(artifact: Arc<ModelArtifact>, spec: FeatureSpec, threshold: f64) -> PiRiskResult<Self> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(PiRiskError::config(format!(
                "decision threshold must be in (0, 1), got {threshold}"
            )));
        }
        if spec.len() != artifact.num_features() {
            return Err(PiRiskError::model_load(
                artifact.source(),
                format!(
                    "artifact expects {} features, schema has {}",
                    artifact.num_features(),
                    spec.len()
                ),
            ));
        }
        Ok(Self {
            artifact,
            spec,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Label and probability come from a single margin evaluation.
    pub fn classify(&self, row: &FeatureRow) -> PiRiskResult<PredictionResult> {
        check_alignment(&self.spec, row)?;

        let margin = self.artifact.margin(row.values());
        let probability = sigmoid(margin);
        if !probability.is_finite() {
            return Err(PiRiskError::internal(format!(
                "model produced a non-finite score ({margin})"
            )));
        }

        Ok(PredictionResult {
            label: u8::from(probability > self.threshold),
            probability,
            margin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_schema::Feature;

    #[test]
    fn sigmoid_is_centered() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
    }

    #[test]
    fn alignment_lists_swapped_columns() {
        let spec = FeatureSpec::from_names(&["Glucose", "Sedatives", "Days_in_ICU"]).unwrap();
        let row = FeatureRow::from_parts(
            vec![Feature::Sedatives, Feature::Glucose, Feature::DaysInIcu],
            vec![0.0, 5.0, 3.0],
        )
        .unwrap();

        let err = check_alignment(&spec, &row).unwrap_err();
        match err {
            PiRiskError::SchemaMismatch { columns, .. } => {
                assert!(columns.contains("#0: expected Glucose got Sedatives"));
                assert!(columns.contains("#1: expected Sedatives got Glucose"));
                assert!(!columns.contains("#2"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn alignment_reports_short_rows() {
        let spec = FeatureSpec::from_names(&["Glucose", "Sedatives"]).unwrap();
        let row = FeatureRow::from_parts(vec![Feature::Glucose], vec![5.0]).unwrap();
        let err = check_alignment(&spec, &row).unwrap_err();
        assert!(err.to_string().contains("expected Sedatives got <none>"));
    }
}
