use super::{types::Config, ConfigError};

fn check_fraction(name: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

fn check_margin(name: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be a finite number"
        )));
    }
    Ok(())
}

/// Validate configuration
/// Currently validates:
/// - Page size is not 0
/// - Visibility thresholds are fractions
/// - Trigger margins are finite
/// - Mock failure rate is a probability
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.pagination.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "pagination.page_size cannot be 0".to_string(),
        ));
    }

    let sentinel = &config.pagination.sentinel;
    check_margin("pagination.sentinel.trigger_margin", sentinel.trigger_margin)?;
    check_fraction(
        "pagination.sentinel.visibility_threshold",
        sentinel.visibility_threshold,
    )?;

    check_margin("media.trigger_margin", config.media.trigger_margin)?;
    check_fraction("media.visibility_threshold", config.media.visibility_threshold)?;
    check_fraction(
        "media.video_visibility_threshold",
        config.media.video_visibility_threshold,
    )?;

    let rate = config.mock.failure_rate;
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::ValidationError(format!(
            "mock.failure_rate must be between 0.0 and 1.0, got {rate}"
        )));
    }

    Ok(())
}
