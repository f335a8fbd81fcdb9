use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    config::{AppConfig, FormDefaults},
    errors::PiRiskResult,
    feature_adapter::RawValue,
    feature_schema::Feature,
    pipeline::Pipeline,
};

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub defaults: FormDefaults,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, defaults: FormDefaults) -> Self {
        Self { pipeline, defaults }
    }

    pub fn from_config(config: &AppConfig) -> PiRiskResult<Self> {
        let pipeline = Pipeline::from_config(config)?;
        Ok(Self::new(Arc::new(pipeline), config.defaults.clone()))
    }

    /// Default form values as the text the widgets display.
    pub fn default_form_values(&self) -> BTreeMap<Feature, String> {
        self.pipeline
            .spec()
            .iter()
            .map(|f| {
                let text = match self.defaults.value(f) {
                    RawValue::Number(n) => n.to_string(),
                    RawValue::Text(s) => s,
                };
                (f, text)
            })
            .collect()
    }
}
