//! Pipeline orchestrator - wires the demo publisher and receiver together.
//!
//! The demo models a vehicle driving a slow circle in `world` with a laser
//! rigidly mounted on its base. One transformer instance publishes the
//! moving tree, a second resolves `laser` in `world` through the
//! in-process bus, exactly as two separate processes would over a real
//! transport.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use communicator::InProcessBus;
use contracts::{Quat, TransformerConfig, Vec3, TIME_LATEST};
use observability::{record_lookup_latency_ms, record_publish, LookupMetricsAggregator};
use tracing::{debug, info, warn};
use transformer::{TransformPublisher, TransformReceiver, TransformerFactory};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Transformer configuration shared by both instances
    pub config: TransformerConfig,

    /// Maximum number of lookups (None = unlimited)
    pub max_lookups: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Transform publish rate in Hz
    pub publish_rate_hz: f64,

    /// Lookup rate in Hz
    pub lookup_rate_hz: f64,

    /// In-process bus channel capacity
    pub bus_capacity: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)
                .map_err(|e| CliError::pipeline_execution(e.to_string()))?;
        }

        let bus = InProcessBus::new(self.config.bus_capacity);

        let (vehicle_receiver, vehicle_publisher) = TransformerFactory::create(
            self.config.config.clone(),
            Arc::new(bus.endpoint("vehicle")),
        )
        .map_err(|e| CliError::pipeline_execution(e.to_string()))?;

        let monitor = TransformerFactory::create_receiver(
            self.config.config.clone(),
            Arc::new(bus.endpoint("monitor")),
        )
        .map_err(|e| CliError::pipeline_execution(e.to_string()))?;

        // Start the publisher task
        let running = Arc::new(AtomicBool::new(true));
        let published = Arc::new(AtomicU64::new(0));
        let publisher_task = tokio::spawn(publish_loop(
            vehicle_publisher,
            Arc::clone(&running),
            Arc::clone(&published),
            self.config.publish_rate_hz,
        ));

        // Wait for the tree to become resolvable (exercises the async
        // request path the same way a late-joining consumer would)
        let first = monitor
            .request_transform(&"world".into(), &"laser".into(), TIME_LATEST)
            .await;
        match first {
            Ok(_) => debug!("frame tree resolvable, starting lookups"),
            Err(e) => warn!(error = %e, "initial transform request failed"),
        }

        // Shared so a timeout still reports partial progress
        let attempted = Arc::new(AtomicU64::new(0));
        let resolved = Arc::new(AtomicU64::new(0));
        let aggregator = Arc::new(Mutex::new(LookupMetricsAggregator::new()));

        let started = Instant::now();
        let lookup_task = lookup_loop(
            monitor.clone(),
            self.config.max_lookups,
            self.config.lookup_rate_hz,
            Arc::clone(&attempted),
            Arc::clone(&resolved),
            Arc::clone(&aggregator),
        );

        // Run with optional timeout
        if let Some(timeout) = self.config.timeout {
            if tokio::time::timeout(timeout, lookup_task).await.is_err() {
                warn!(timeout_secs = timeout.as_secs(), "Pipeline timed out");
            }
        } else {
            lookup_task.await;
        }
        let duration = started.elapsed();

        // Teardown: stop publishing, then release both instances
        running.store(false, Ordering::SeqCst);
        let _ = tokio::time::timeout(Duration::from_secs(5), publisher_task).await;

        let frames_seen = monitor.frames().len();
        vehicle_receiver.shutdown();
        monitor.shutdown();

        info!("pipeline teardown complete");

        let lookup_metrics = aggregator.lock().unwrap().clone();
        Ok(PipelineStats {
            lookups_attempted: attempted.load(Ordering::SeqCst),
            lookups_resolved: resolved.load(Ordering::SeqCst),
            transforms_published: published.load(Ordering::SeqCst),
            frames_seen,
            duration,
            lookup_metrics,
        })
    }
}

/// Publish the demo frame tree until told to stop.
async fn publish_loop(
    publisher: TransformPublisher,
    running: Arc<AtomicBool>,
    published: Arc<AtomicU64>,
    rate_hz: f64,
) {
    let interval = Duration::from_secs_f64(1.0 / rate_hz.clamp(0.1, 1000.0));
    let start = Instant::now();

    info!(rate_hz, authority = publisher.authority(), "publisher started");

    while running.load(Ordering::Relaxed) {
        let elapsed = start.elapsed();
        let time = elapsed.as_nanos() as u64 + 1;

        // Vehicle base drives a slow circle of radius 5m
        let angle = elapsed.as_secs_f64() * 0.5;
        let translation = Vec3::new(5.0 * angle.cos(), 5.0 * angle.sin(), 0.0);
        let heading = angle + std::f64::consts::FRAC_PI_2;
        let rotation = Quat::new(0.0, 0.0, (heading / 2.0).sin(), (heading / 2.0).cos());

        if publisher
            .send("base", "world", time, translation, rotation)
            .is_err()
        {
            break;
        }
        record_publish(publisher.authority());
        published.fetch_add(1, Ordering::Relaxed);

        // Laser is rigidly mounted on the base
        if publisher
            .send(
                "laser",
                "base",
                time,
                Vec3::new(0.2, 0.0, 0.3),
                Quat::IDENTITY,
            )
            .is_err()
        {
            break;
        }
        record_publish(publisher.authority());
        published.fetch_add(1, Ordering::Relaxed);

        tokio::time::sleep(interval).await;
    }

    debug!("publisher stopped");
}

/// Resolve `laser` in `world` at the configured rate.
async fn lookup_loop(
    monitor: TransformReceiver,
    max_lookups: Option<u64>,
    rate_hz: f64,
    attempted: Arc<AtomicU64>,
    resolved: Arc<AtomicU64>,
    aggregator: Arc<Mutex<LookupMetricsAggregator>>,
) {
    let interval = Duration::from_secs_f64(1.0 / rate_hz.clamp(0.1, 1000.0));
    let target = "world".into();
    let source = "laser".into();

    loop {
        let lookup_start = Instant::now();
        let result = monitor.lookup_transform(&target, &source, TIME_LATEST);
        let latency_ms = lookup_start.elapsed().as_secs_f64() * 1000.0;

        record_lookup_latency_ms(latency_ms);
        aggregator.lock().unwrap().update(&result, latency_ms);

        let count = attempted.fetch_add(1, Ordering::SeqCst) + 1;
        match result {
            Ok(transform) => {
                resolved.fetch_add(1, Ordering::SeqCst);
                if count.is_multiple_of(50) {
                    info!(
                        lookups = count,
                        x = format!("{:.2}", transform.translation.x),
                        y = format!("{:.2}", transform.translation.y),
                        "laser position in world"
                    );
                }
            }
            Err(error) => debug!(%error, "lookup failed"),
        }

        if let Some(max) = max_lookups {
            if count >= max {
                break;
            }
        }

        tokio::time::sleep(interval).await;
    }
}
