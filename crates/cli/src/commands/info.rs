//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    authority: Option<String>,
    buffer: BufferInfo,
    extrapolation: ExtrapolationInfo,
    request: RequestInfo,
}

#[derive(Serialize)]
struct BufferInfo {
    cache_time_s: f64,
    max_samples: usize,
}

#[derive(Serialize)]
struct ExtrapolationInfo {
    policy: String,
    max_duration_s: f64,
}

#[derive(Serialize)]
struct RequestInfo {
    default_timeout_s: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = ConfigInfo {
        authority: config.authority.clone(),
        buffer: BufferInfo {
            cache_time_s: config.buffer.cache_time_s,
            max_samples: config.buffer.max_samples,
        },
        extrapolation: ExtrapolationInfo {
            policy: format!("{:?}", config.extrapolation.policy),
            max_duration_s: config.extrapolation.max_duration_s,
        },
        request: RequestInfo {
            default_timeout_s: config.request.default_timeout_s,
        },
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?
        );
    } else {
        println!("Configuration: {}", args.config.display());
        println!(
            "  Authority: {}",
            info.authority.as_deref().unwrap_or("(default)")
        );
        println!("  Buffer:");
        println!("    Cache horizon: {}s", info.buffer.cache_time_s);
        println!("    Max samples/frame: {}", info.buffer.max_samples);
        println!("  Extrapolation:");
        println!("    Policy: {}", info.extrapolation.policy);
        println!("    Max duration: {}s", info.extrapolation.max_duration_s);
        println!("  Requests:");
        println!("    Default timeout: {}s", info.request.default_timeout_s);
    }

    Ok(())
}
