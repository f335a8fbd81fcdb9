// Structured logging setup.

use crate::errors::{PiRiskError, PiRiskResult};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the configured
/// filter when set.
pub fn init_tracing(filter: &str) -> PiRiskResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| PiRiskError::config(format!("invalid log filter {filter:?}: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| PiRiskError::internal(format!("tracing already initialised: {e}")))
}
