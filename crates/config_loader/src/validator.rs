//! Configuration validation
//!
//! Rules:
//! - field range checks from the derive annotations on the config structs
//! - `linear` extrapolation requires a positive max duration
//! - an authority name, if set, must be non-empty

use contracts::{ExtrapolationPolicy, TransformError, TransformerConfig};
use validator::Validate;

/// Validate a parsed configuration
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &TransformerConfig) -> Result<(), TransformError> {
    validate_ranges(config)?;
    validate_extrapolation(config)?;
    validate_authority(config)?;
    Ok(())
}

/// Run the derive-annotated range checks
fn validate_ranges(config: &TransformerConfig) -> Result<(), TransformError> {
    config
        .validate()
        .map_err(|errors| TransformError::config_validation("config", errors.to_string()))
}

/// Check the extrapolation section's internal consistency
fn validate_extrapolation(config: &TransformerConfig) -> Result<(), TransformError> {
    let extrapolation = &config.extrapolation;
    if extrapolation.policy == ExtrapolationPolicy::Linear && extrapolation.max_duration_s <= 0.0 {
        return Err(TransformError::config_validation(
            "extrapolation.max_duration_s",
            format!(
                "linear extrapolation needs a positive max duration, got {}",
                extrapolation.max_duration_s
            ),
        ));
    }
    Ok(())
}

/// Check the authority name
fn validate_authority(config: &TransformerConfig) -> Result<(), TransformError> {
    if let Some(authority) = &config.authority {
        if authority.trim().is_empty() {
            return Err(TransformError::config_validation(
                "authority",
                "authority name must not be empty",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ExtrapolationPolicy;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&TransformerConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_cache_time_rejected() {
        let mut config = TransformerConfig::default();
        config.buffer.cache_time_s = 0.0;
        let result = validate(&config);
        assert!(matches!(
            result,
            Err(TransformError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_linear_needs_positive_max_duration() {
        let mut config = TransformerConfig::default();
        config.extrapolation.policy = ExtrapolationPolicy::Linear;
        config.extrapolation.max_duration_s = 0.0;
        let result = validate(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("max_duration_s"));
    }

    #[test]
    fn test_empty_authority_rejected() {
        let mut config = TransformerConfig::default();
        config.authority = Some("  ".to_string());
        assert!(validate(&config).is_err());
    }
}
