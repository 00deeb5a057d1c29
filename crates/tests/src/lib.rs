//! # Integration Tests
//!
//! End-to-end tests over the full stack: publisher → in-process bus →
//! core ingestion → resolver/requests, all through the public facade.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;
    use std::time::Duration;

    use communicator::InProcessBus;
    use contracts::{FrameId, Quat, TransformerConfig, Vec3};
    use transformer::{TransformPublisher, TransformReceiver, TransformerFactory};

    pub const SECOND: u64 = 1_000_000_000;

    pub fn config() -> TransformerConfig {
        let mut config = TransformerConfig::default();
        config.request.default_timeout_s = 0.3;
        config
    }

    /// Two transformer instances joined by one bus: (publisher side, monitor side)
    pub fn linked_pair(
        bus: &InProcessBus,
        config: TransformerConfig,
    ) -> (TransformReceiver, TransformPublisher, TransformReceiver) {
        let (vehicle_receiver, vehicle_publisher) =
            TransformerFactory::create(config.clone(), Arc::new(bus.endpoint("vehicle")))
                .expect("vehicle instance");
        let monitor = TransformerFactory::create_receiver(config, Arc::new(bus.endpoint("monitor")))
            .expect("monitor instance");
        (vehicle_receiver, vehicle_publisher, monitor)
    }

    pub fn frame(name: &str) -> FrameId {
        name.into()
    }

    pub fn send(
        publisher: &TransformPublisher,
        child: &str,
        parent: &str,
        time: u64,
        translation: Vec3,
    ) {
        publisher
            .send(child, parent, time, translation, Quat::IDENTITY)
            .expect("publish");
    }

    /// Wait until `predicate` holds or the deadline passes.
    pub async fn wait_until<F: Fn() -> bool>(predicate: F, deadline: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < deadline {
            if predicate() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        predicate()
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use communicator::InProcessBus;
    use contracts::{TransformError, Vec3, TIME_LATEST};

    use crate::helpers::*;

    /// Publish through the bus, observe on an independent instance.
    #[tokio::test]
    async fn test_publish_reaches_remote_lookup() {
        let bus = InProcessBus::new(64);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config());

        send(&publisher, "base", "world", SECOND, Vec3::new(2.0, 0.0, 0.0));
        send(&publisher, "laser", "base", SECOND, Vec3::new(0.5, 0.0, 0.0));

        let delivered = wait_until(
            || monitor.can_transform(&frame("world"), &frame("laser"), SECOND),
            Duration::from_secs(2),
        )
        .await;
        assert!(delivered, "transforms never reached the monitor instance");

        let result = monitor
            .lookup_transform(&frame("world"), &frame("laser"), SECOND)
            .unwrap();
        assert!((result.translation.x - 2.5).abs() < 1e-9);
        assert_eq!(result.child_frame, "laser");
        assert_eq!(result.parent_frame, "world");

        // The publishing instance sees its own transforms via loopback
        assert!(vehicle.can_transform(&frame("world"), &frame("laser"), SECOND));

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Round-trip inverse law across the facade.
    #[tokio::test]
    async fn test_lookup_round_trip_inverse() {
        let bus = InProcessBus::new(64);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config());

        send(&publisher, "base", "world", SECOND, Vec3::new(3.0, -1.0, 2.0));
        wait_until(
            || monitor.can_transform(&frame("world"), &frame("base"), SECOND),
            Duration::from_secs(2),
        )
        .await;

        let forward = monitor
            .lookup_transform(&frame("world"), &frame("base"), SECOND)
            .unwrap();
        let backward = monitor
            .lookup_transform(&frame("base"), &frame("world"), SECOND)
            .unwrap();

        assert!((forward.translation.x + backward.translation.x).abs() < 1e-9);
        assert!((forward.translation.y + backward.translation.y).abs() < 1e-9);
        assert!((forward.translation.z + backward.translation.z).abs() < 1e-9);

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Identity lookups hold for any frame and time.
    #[tokio::test]
    async fn test_identity_lookup() {
        let bus = InProcessBus::new(64);
        let (vehicle, _publisher, monitor) = linked_pair(&bus, config());

        let result = monitor
            .lookup_transform(&frame("anything"), &frame("anything"), 42 * SECOND)
            .unwrap();
        assert_eq!(result.translation, Vec3::ZERO);

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// An async request parks until the matching sample arrives by bus.
    #[tokio::test]
    async fn test_request_completed_by_remote_publish() {
        let bus = InProcessBus::new(64);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config());

        send(&publisher, "base", "world", SECOND, Vec3::new(1.0, 0.0, 0.0));
        wait_until(
            || monitor.can_transform(&frame("world"), &frame("base"), SECOND),
            Duration::from_secs(2),
        )
        .await;

        // Ask for a future instant nothing can satisfy yet
        let pending = monitor.request_transform(&frame("world"), &frame("base"), 3 * SECOND);

        // The matching sample arrives later from the peer
        send(&publisher, "base", "world", 3 * SECOND, Vec3::new(7.0, 0.0, 0.0));

        let result = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .expect("handle must complete")
            .expect("transform must resolve");
        assert!((result.translation.x - 7.0).abs() < 1e-9);

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Without data, the request times out with the configured deadline.
    #[tokio::test]
    async fn test_request_timeout() {
        let bus = InProcessBus::new(64);
        let (vehicle, _publisher, monitor) = linked_pair(&bus, config());

        let pending = monitor.request_transform(&frame("world"), &frame("base"), SECOND);
        let result = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .expect("handle must complete");
        assert!(matches!(result, Err(TransformError::RequestTimeout { .. })));

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Shutdown drains every outstanding handle with a cancellation.
    #[tokio::test]
    async fn test_shutdown_cancels_outstanding_requests() {
        let bus = InProcessBus::new(64);
        let (vehicle, _publisher, monitor) = linked_pair(&bus, config());

        let pending_a = monitor.request_transform(&frame("world"), &frame("base"), SECOND);
        let pending_b = monitor.request_transform(&frame("map"), &frame("laser"), SECOND);

        monitor.shutdown();
        // Idempotent from any thread
        monitor.shutdown();

        for pending in [pending_a, pending_b] {
            let result = tokio::time::timeout(Duration::from_secs(1), pending)
                .await
                .expect("handle must complete");
            assert!(matches!(result, Err(TransformError::Cancelled)));
        }

        vehicle.shutdown();
    }

    /// Fixed-frame lookup through the facade.
    #[tokio::test]
    async fn test_fixed_frame_lookup() {
        let bus = InProcessBus::new(64);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config());

        send(&publisher, "robot", "world", SECOND, Vec3::new(0.0, 0.0, 0.0));
        send(
            &publisher,
            "robot",
            "world",
            4 * SECOND,
            Vec3::new(6.0, 0.0, 0.0),
        );
        wait_until(
            || monitor.can_transform(&frame("world"), &frame("robot"), 4 * SECOND),
            Duration::from_secs(2),
        )
        .await;

        assert!(monitor.can_transform_fixed(
            &frame("robot"),
            4 * SECOND,
            &frame("robot"),
            SECOND,
            &frame("world"),
        ));
        let result = monitor
            .lookup_transform_fixed(
                &frame("robot"),
                4 * SECOND,
                &frame("robot"),
                SECOND,
                &frame("world"),
            )
            .unwrap();
        // The robot moved +6m in x, so its old pose sits 6m behind the new one
        assert!((result.translation.x + 6.0).abs() < 1e-9);

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// `can_transform` answers must agree with `lookup_transform`.
    #[tokio::test]
    async fn test_can_transform_matches_lookup() {
        let bus = InProcessBus::new(64);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config());

        send(&publisher, "base", "world", SECOND, Vec3::new(1.0, 0.0, 0.0));
        wait_until(
            || monitor.can_transform(&frame("world"), &frame("base"), SECOND),
            Duration::from_secs(2),
        )
        .await;

        let cases: Vec<(contracts::FrameId, contracts::FrameId, u64)> = vec![
            (frame("world"), frame("base"), SECOND),
            (frame("base"), frame("world"), SECOND),
            (frame("world"), frame("base"), 99 * SECOND),
            (frame("world"), frame("ghost"), SECOND),
        ];
        for (target, source, time) in cases {
            let can = monitor.can_transform(&target, &source, time);
            let did = monitor.lookup_transform(&target, &source, time).is_ok();
            assert_eq!(can, did, "mismatch for {target}←{source}@{time}");
        }

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Ingest flood on one subtree must not starve lookups on another.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_does_not_block_unrelated_lookups() {
        let bus = InProcessBus::new(4096);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config());

        // Static pair the lookups will touch
        send(&publisher, "static", "anchor", SECOND, Vec3::new(1.0, 0.0, 0.0));
        wait_until(
            || monitor.can_transform(&frame("anchor"), &frame("static"), SECOND),
            Duration::from_secs(2),
        )
        .await;

        // Flood an unrelated frame from a separate task
        let flood_publisher = publisher.clone();
        let flood = tokio::spawn(async move {
            for i in 0..2000u64 {
                let _ = flood_publisher.send(
                    "hot",
                    "anchor2",
                    SECOND + i,
                    Vec3::new(i as f64, 0.0, 0.0),
                    contracts::Quat::IDENTITY,
                );
                if i % 256 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        });

        // Lookups on the untouched pair stay live throughout the flood
        let lookup_monitor = monitor.clone();
        let lookups = tokio::task::spawn_blocking(move || {
            for _ in 0..500 {
                let result = lookup_monitor.lookup_transform(
                    &frame("anchor"),
                    &frame("static"),
                    SECOND,
                );
                assert!(result.is_ok());
            }
        });

        let both = tokio::time::timeout(Duration::from_secs(10), async {
            flood.await.unwrap();
            lookups.await.unwrap();
        })
        .await;
        assert!(both.is_ok(), "lookups starved by concurrent ingestion");

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Loading a config file and driving an instance from it.
    #[tokio::test]
    async fn test_config_driven_instance() {
        let content = r#"
authority = "integration"

[buffer]
cache_time_s = 2.0
max_samples = 16

[extrapolation]
policy = "clamp"
max_duration_s = 0.5
"#;
        let config =
            config_loader::ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Toml)
                .unwrap();

        let bus = InProcessBus::new(64);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config);
        assert_eq!(publisher.authority(), "integration");

        send(&publisher, "base", "world", SECOND, Vec3::new(1.0, 0.0, 0.0));
        wait_until(
            || monitor.can_transform(&frame("world"), &frame("base"), SECOND),
            Duration::from_secs(2),
        )
        .await;

        // Clamp policy answers far-future queries with the boundary sample
        let result = monitor
            .lookup_transform(&frame("world"), &frame("base"), 50 * SECOND)
            .unwrap();
        assert!((result.translation.x - 1.0).abs() < 1e-9);

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Lookup outcomes feed the observability aggregator.
    #[tokio::test]
    async fn test_lookup_metrics_aggregation() {
        let bus = InProcessBus::new(64);
        let (vehicle, publisher, monitor) = linked_pair(&bus, config());

        send(&publisher, "base", "world", SECOND, Vec3::new(3.0, 4.0, 0.0));
        wait_until(
            || monitor.can_transform(&frame("world"), &frame("base"), SECOND),
            Duration::from_secs(2),
        )
        .await;

        let mut aggregator = observability::LookupMetricsAggregator::new();
        let ok = monitor.lookup_transform(&frame("world"), &frame("base"), SECOND);
        aggregator.update(&ok, 0.1);
        let err = monitor.lookup_transform(&frame("world"), &frame("ghost"), SECOND);
        aggregator.update(&err, 0.1);

        let summary = aggregator.summary();
        assert_eq!(summary.total_lookups, 2);
        assert_eq!(summary.successful_lookups, 1);
        assert_eq!(summary.failure_counts.get("frame_not_found"), Some(&1));

        vehicle.shutdown();
        monitor.shutdown();
    }

    /// Multiple cores in one process stay fully independent.
    #[tokio::test]
    async fn test_independent_cores() {
        let bus_a = InProcessBus::new(64);
        let bus_b = InProcessBus::new(64);
        let (vehicle_a, publisher_a, _monitor_a) = linked_pair(&bus_a, config());
        let (vehicle_b, _publisher_b, monitor_b) = linked_pair(&bus_b, config());

        send(&publisher_a, "base", "world", SECOND, Vec3::new(1.0, 0.0, 0.0));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Bus B never saw anything from bus A
        assert!(!monitor_b.can_transform(&frame("world"), &frame("base"), SECOND));
        assert!(monitor_b.frames().is_empty());

        vehicle_a.shutdown();
        vehicle_b.shutdown();
    }
}
