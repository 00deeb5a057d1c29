//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    // Load configuration (defaults if no file given)
    let config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .map_err(|e| CliError::config_load(e.to_string()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            contracts::TransformerConfig::default()
        }
    };

    info!(
        authority = config.authority.as_deref().unwrap_or("framelink"),
        cache_time_s = config.buffer.cache_time_s,
        policy = ?config.extrapolation.policy,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        config,
        max_lookups: if args.max_lookups == 0 {
            None
        } else {
            Some(args.max_lookups)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        publish_rate_hz: args.publish_rate,
        lookup_rate_hz: args.lookup_rate,
        bus_capacity: args.bus_capacity,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Create pipeline and a graceful shutdown handler
    let pipeline = Pipeline::new(pipeline_config);
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        lookups = stats.lookups_attempted,
                        resolved = stats.lookups_resolved,
                        published = stats.transforms_published,
                        duration_secs = stats.duration.as_secs_f64(),
                        rate = format!("{:.2}/s", stats.lookup_rate()),
                        "Pipeline completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("framelink finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::TransformerConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!(
        "Authority: {}",
        config.authority.as_deref().unwrap_or("(default)")
    );
    println!("Buffer:");
    println!("  Cache horizon: {}s", config.buffer.cache_time_s);
    println!("  Max samples/frame: {}", config.buffer.max_samples);
    println!("Extrapolation:");
    println!("  Policy: {:?}", config.extrapolation.policy);
    println!("  Max duration: {}s", config.extrapolation.max_duration_s);
    println!("Requests:");
    println!("  Default timeout: {}s", config.request.default_timeout_s);
}
