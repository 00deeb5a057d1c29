//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    authority: Option<String>,
    cache_time_s: f64,
    max_samples: usize,
    extrapolation_policy: String,
    default_timeout_s: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    authority: config.authority.clone(),
                    cache_time_s: config.buffer.cache_time_s,
                    max_samples: config.buffer.max_samples,
                    extrapolation_policy: format!("{:?}", config.extrapolation.policy),
                    default_timeout_s: config.request.default_timeout_s,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &contracts::TransformerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.authority.is_none() {
        warnings.push("No authority configured - published transforms log as 'framelink'".into());
    }

    if config.buffer.cache_time_s < 1.0 {
        warnings.push(format!(
            "cache_time_s = {} is short; late-arriving samples will be rejected aggressively",
            config.buffer.cache_time_s
        ));
    }

    if config.request.default_timeout_s > 60.0 {
        warnings.push(format!(
            "default_timeout_s = {} is long; stuck requests hold their handles for that duration",
            config.request.default_timeout_s
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!(
                "\n  Authority: {}",
                summary.authority.as_deref().unwrap_or("(default)")
            );
            println!("  Cache horizon: {}s", summary.cache_time_s);
            println!("  Max samples/frame: {}", summary.max_samples);
            println!("  Extrapolation: {}", summary.extrapolation_policy);
            println!("  Request timeout: {}s", summary.default_timeout_s);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/framelink.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_good_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "authority = \"demo\"\n[buffer]\ncache_time_s = 5.0\nmax_samples = 100"
        )
        .unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.summary.unwrap().max_samples, 100);
    }

    #[test]
    fn test_validate_bad_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[buffer]\ncache_time_s = 0.0\nmax_samples = 100").unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
    }
}
