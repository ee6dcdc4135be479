use std::fs;
use std::path::Path;

use fc_core::EngineConfig;

use crate::error::{DataError, Result};

/// Parse an engine config from TOML. Missing keys take their defaults.
pub fn parse_config(text: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(text)?;
    if config.selection_capacity == 0 {
        return Err(DataError::InvalidData(
            "selection_capacity must be at least 1".to_string(),
        ));
    }
    if config.estimator.bytes_per_record_factor < 0.0 {
        return Err(DataError::InvalidData(
            "estimator.bytes_per_record_factor must not be negative".to_string(),
        ));
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text)?;
    tracing::info!(
        path = %path.display(),
        capacity = config.selection_capacity,
        latency_ms = config.conversation.response_latency_ms,
        "config loaded"
    );
    Ok(config)
}
