//! Loading and validating [`AccidentsConfig`] from TOML.

use std::path::Path;

pub use accidents_costing_models::AccidentsConfig;

use crate::AccidentError;

/// Reads, parses and validates a TOML config file.
///
/// # Errors
///
/// Returns [`AccidentError`] if the file cannot be read, is not valid
/// TOML, or fails [`validate`].
pub fn load_config(path: &Path) -> Result<AccidentsConfig, AccidentError> {
    let contents = std::fs::read_to_string(path)?;
    let config = parse_config(&contents)?;
    log::info!("Loaded accident config from {}", path.display());
    Ok(config)
}

/// Parses and validates a TOML config string. Missing keys take their
/// defaults.
///
/// # Errors
///
/// Returns [`AccidentError`] if the string is not valid TOML, contains
/// unknown keys, or fails [`validate`].
pub fn parse_config(toml_str: &str) -> Result<AccidentsConfig, AccidentError> {
    let config: AccidentsConfig = toml::from_str(toml_str)?;
    validate(&config)?;
    Ok(config)
}

/// Checks numeric ranges. The computation method is *not* checked here;
/// it is resolved against the formula registry when the pipeline runs.
///
/// # Errors
///
/// Returns [`AccidentError::InvalidConfig`] describing the first
/// offending value.
pub fn validate(config: &AccidentsConfig) -> Result<(), AccidentError> {
    let invalid = |message: String| Err(AccidentError::InvalidConfig { message });

    if !(config.time_bin_size.is_finite() && config.time_bin_size > 0.0) {
        return invalid(format!(
            "time_bin_size must be positive, got {}",
            config.time_bin_size
        ));
    }
    if !(config.max_time.is_finite() && config.max_time >= config.time_bin_size) {
        return invalid(format!(
            "max_time ({}) must be at least time_bin_size ({})",
            config.max_time, config.time_bin_size
        ));
    }
    if !(config.sample_size.is_finite() && config.sample_size >= 0.0) {
        return invalid(format!(
            "sample_size must be non-negative, got {}",
            config.sample_size
        ));
    }

    Ok(())
}
