use crate::errors::PiRiskResult;
use crate::feature_adapter::FeatureRow;
use crate::feature_schema::{Feature, FeatureSpec};
use crate::model_artifact::ModelArtifact;
use crate::prediction::check_alignment;
use crate::tree_shap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One feature's share of the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub feature: Feature,
    /// Model input value for the row
    pub value: f64,
    /// Attribution in log-odds
    pub shap: f64,
}

/// Attributions for a single row, in spec order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    /// Expected model margin over the training data
    pub base_value: f64,
    pub contributions: Vec<Contribution>,
}

impl AttributionResult {
    /// `base_value + Σ shap`, which reproduces the row's margin.
    pub fn output_value(&self) -> f64 {
        self.base_value + self.contributions.iter().map(|c| c.shap).sum::<f64>()
    }

    pub fn get(&self, feature: Feature) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.feature == feature)
    }

    /// Contributions by decreasing magnitude.
    pub fn ranked(&self) -> Vec<Contribution> {
        let mut ranked = self.contributions.clone();
        ranked.sort_by(|a, b| b.shap.abs().total_cmp(&a.shap.abs()));
        ranked
    }
}

/// Tree explainer bound once to the loaded artifact.
#[derive(Debug, Clone)]
pub struct Explainer {
    artifact: Arc<ModelArtifact>,
    spec: FeatureSpec,
    expected_value: f64,
}

impl Explainer {
    pub fn new(artifact: Arc<ModelArtifact>, spec: FeatureSpec) -> Self {
        let expected_value = artifact.base_margin()
            + artifact
                .trees()
                .iter()
                .map(|t| t.expected_value())
                .sum::<f64>();

        tracing::debug!(
            trees = artifact.trees().len(),
            expected_value,
            "tree explainer bound"
        );

        Self {
            artifact,
            spec,
            expected_value,
        }
    }

    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn explain(&self, row: &FeatureRow) -> PiRiskResult<AttributionResult> {
        check_alignment(&self.spec, row)?;

        let values = row.values();
        let mut phi = vec![0.0; values.len()];
        for tree in self.artifact.trees() {
            tree_shap::accumulate(tree, values, &mut phi);
        }

        let contributions = row
            .iter()
            .zip(phi)
            .map(|((feature, value), shap)| Contribution {
                feature,
                value,
                shap,
            })
            .collect();

        Ok(AttributionResult {
            base_value: self.expected_value,
            contributions,
        })
    }
}
