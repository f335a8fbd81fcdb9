//! pipeline.rs
//! One submission, start to finish: raw form values → feature row → prediction
//! and attributions. Holds only read-only state, so a single instance is
//! shared by every request.

use crate::config::AppConfig;
use crate::errors::PiRiskResult;
use crate::explanation::{AttributionResult, Explainer};
use crate::feature_adapter::{build_feature_row, FeatureRow, RawInput};
use crate::feature_schema::FeatureSpec;
use crate::input_validator::InputValidator;
use crate::model_artifact::ModelArtifact;
use crate::prediction::{PredictionResult, Predictor};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything produced for one submission.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub request_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub features: FeatureRow,
    pub prediction: PredictionResult,
    pub attribution: AttributionResult,
}

#[derive(Debug)]
pub struct Pipeline {
    artifact: Arc<ModelArtifact>,
    spec: FeatureSpec,
    predictor: Predictor,
    explainer: Explainer,
    validator: InputValidator,
}

impl Pipeline {
    pub fn new(artifact: ModelArtifact, threshold: f64) -> PiRiskResult<Self> {
        let spec = artifact.feature_spec()?;
        if !artifact.has_feature_names() {
            warn!(
                path = artifact.source(),
                "artifact carries no feature names; assuming the canonical column order"
            );
        }

        let artifact = Arc::new(artifact);
        let predictor = Predictor::new(Arc::clone(&artifact), spec.clone(), threshold)?;
        let explainer = Explainer::new(Arc::clone(&artifact), spec.clone());

        info!(
            features = spec.len(),
            schema = %&spec.fingerprint()[..12],
            threshold,
            "prediction pipeline ready"
        );

        Ok(Self {
            artifact,
            spec,
            predictor,
            explainer,
            validator: InputValidator::new(),
        })
    }

    /// Load the artifact named by the config. A missing or corrupt file is fatal.
    pub fn from_config(config: &AppConfig) -> PiRiskResult<Self> {
        info!(path = %config.model_path, "loading model artifact");
        let artifact = ModelArtifact::load(&config.model_path)?;
        Self::new(artifact, config.decision_threshold)
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    /// Adapter plus range checks. Fails before the model is consulted.
    pub fn build_row(&self, raw: &RawInput) -> PiRiskResult<FeatureRow> {
        let row = build_feature_row(raw, &self.spec)?;
        self.validator.validate_row(&row)?;
        Ok(row)
    }

    pub fn classify(&self, row: &FeatureRow) -> PiRiskResult<PredictionResult> {
        self.predictor.classify(row)
    }

    pub fn explain(&self, row: &FeatureRow) -> PiRiskResult<AttributionResult> {
        self.explainer.explain(row)
    }

    pub fn assess(&self, raw: &RawInput) -> PiRiskResult<Assessment> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("assess", %request_id);
        let _guard = span.enter();

        let features = match self.build_row(raw) {
            Ok(row) => row,
            Err(e) => {
                info!(error = %e, "submission rejected");
                return Err(e);
            }
        };
        debug!(values = ?features.values(), "feature row built");

        let prediction = self.classify(&features)?;
        let attribution = self.explain(&features)?;

        info!(
            label = prediction.label,
            probability = prediction.probability,
            "submission scored"
        );

        Ok(Assessment {
            request_id,
            evaluated_at: Utc::now(),
            features,
            prediction,
            attribution,
        })
    }

    pub fn status(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.artifact.source(),
            "model_fingerprint": self.artifact.fingerprint(),
            "objective": self.artifact.objective().name(),
            "trees": self.artifact.trees().len(),
            "schema_fingerprint": self.spec.fingerprint(),
            "features": self.spec.names(),
            "decision_threshold": self.predictor.threshold(),
            "expected_value": self.explainer.expected_value(),
        })
    }
}
