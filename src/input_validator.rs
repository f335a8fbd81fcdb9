use crate::errors::{PiRiskError, PiRiskResult};
use crate::feature_adapter::FeatureRow;
use crate::feature_schema::{Feature, FeatureKind};
use std::collections::BTreeMap;

/// Range checks the form widgets enforce, applied again on the server so JSON
/// clients get the same treatment as browser users.
///
/// Only lower bounds are checked. Implausibly large lab values are passed to
/// the model unchanged.
#[derive(Debug, Clone)]
pub struct InputValidator {
    minimums: BTreeMap<Feature, f64>,
}

impl InputValidator {
    pub fn new() -> Self {
        let minimums = Feature::ALL
            .iter()
            .filter(|f| !f.is_categorical())
            .map(|f| (*f, 0.0))
            .collect();

        Self { minimums }
    }

    /// Validate a coerced row
    pub fn validate_row(&self, row: &FeatureRow) -> PiRiskResult<()> {
        for (feature, value) in row.iter() {
            if let Some(min) = self.minimums.get(&feature) {
                if value < *min {
                    return Err(PiRiskError::validation(
                        feature.column_name(),
                        format!("must be at least {min}, got {value}"),
                    ));
                }
            }

            if feature.kind() == (FeatureKind::ContinuousNumeric { integral: true })
                && value.fract() != 0.0
            {
                return Err(PiRiskError::validation(
                    feature.column_name(),
                    format!("must be a whole number, got {value}"),
                ));
            }
        }

        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}
