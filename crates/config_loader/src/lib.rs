//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a ready-to-use `TransformerConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("framelink.toml")).unwrap();
//! println!("cache horizon: {}s", config.buffer.cache_time_s);
//! ```

mod parser;
mod validator;

pub use contracts::TransformerConfig;
pub use parser::ConfigFormat;

use contracts::TransformError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<TransformerConfig, TransformError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<TransformerConfig, TransformError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize a configuration to a TOML string
    pub fn to_toml(config: &TransformerConfig) -> Result<String, TransformError> {
        toml::to_string_pretty(config)
            .map_err(|e| TransformError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a configuration to a JSON string
    pub fn to_json(config: &TransformerConfig) -> Result<String, TransformError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| TransformError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, TransformError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            TransformError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            TransformError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, TransformError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<TransformerConfig, TransformError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
authority = "robot_1"

[buffer]
cache_time_s = 5.0
max_samples = 200

[extrapolation]
policy = "linear"
max_duration_s = 0.5

[request]
default_timeout_s = 2.0
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.buffer.max_samples, 200);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.authority, config2.authority);
        assert_eq!(config.buffer.cache_time_s, config2.buffer.cache_time_s);
        assert_eq!(config.extrapolation.policy, config2.extrapolation.policy);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.buffer.max_samples, config2.buffer.max_samples);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // Zero cache horizon parses fine but fails validation
        let content = r#"
[buffer]
cache_time_s = 0.0
max_samples = 100
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(TransformError::ConfigValidation { .. })
        ));
    }
}
