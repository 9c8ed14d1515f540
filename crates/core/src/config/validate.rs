use super::{
    types::{Config, SourceBackend},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one trustee is tracked
/// - Poll interval is not 0
/// - The API backend has a token
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.tracking.trustees.iter().all(|t| t.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "tracking.trustees must name at least one trustee".to_string(),
        ));
    }

    if config.poller.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "poller.interval_secs cannot be 0".to_string(),
        ));
    }

    let source = &config.source;
    if source.backend == SourceBackend::Api
        && source.api.as_ref().map_or(true, |a| a.token.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "source.backend = \"api\" requires source.api.token".to_string(),
        ));
    }

    Ok(())
}
