//! # Integration Tests
//!
//! End-to-end tests: MockBroker → IngestionPipeline → MemoryStore.
//!
//! Covers:
//! - Contract snapshot checks
//! - Delivery scenarios (valid, heartbeat, invalid, store failure, replay)
//! - Concurrent delivery and shutdown draining

#[cfg(test)]
mod contract_tests {
    use contracts::{ContractError, LifecycleState, TELEMETRY_QOS, TELEMETRY_TOPIC};

    #[test]
    fn test_compiled_subscription() {
        assert_eq!(TELEMETRY_TOPIC, "bike_data");
        assert_eq!(TELEMETRY_QOS.level(), 1);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ContractError::store_connection("refused").is_startup_fatal());
        assert!(ContractError::broker_subscribe("bike_data", "refused").is_startup_fatal());
        assert!(!ContractError::store_write("bikes_history", "timeout").is_startup_fatal());
    }

    #[test]
    fn test_lifecycle_default() {
        assert_eq!(LifecycleState::default(), LifecycleState::Idle);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use broker::MockBroker;
    use contracts::{BrokerSession, TelemetryStore, TELEMETRY_QOS, TELEMETRY_TOPIC};
    use ingestion::IngestionPipeline;
    use store::{keys, to_document, MemoryStore};

    const SCENARIO_1: &str = r#"{"bike_id":"B1","timestamp":1700000000,"tire":[30.1,30.2],"seat_rotate":[5.0],"isBrake":false,"acceleration":[0.1,0.2,9.8],"seat_tube":101}"#;
    const SCENARIO_2: &str = r#"{"msg":"welcome"}"#;
    const SCENARIO_3: &str = r#"{"bike_id":"B2","timestamp":1700000001,"tire":[30.0],"seat_rotate":null,"isBrake":true,"acceleration":[1.0],"seat_tube":50}"#;

    /// Subscribed mock broker wired to a fresh pipeline over `store`
    struct Harness {
        broker: MockBroker,
        handle: broker::MockBrokerHandle,
        pipeline: Arc<IngestionPipeline<MemoryStore>>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        async fn start(store: MemoryStore) -> Self {
            let store = Arc::new(store);
            let pipeline = Arc::new(IngestionPipeline::new(store.clone()));
            let mut broker = MockBroker::new();
            let handle = broker.handle();

            broker.connect().await.unwrap();
            broker
                .wait_connected(Duration::from_secs(1))
                .await
                .unwrap();
            broker
                .subscribe(TELEMETRY_TOPIC, TELEMETRY_QOS, pipeline.clone())
                .await
                .unwrap();

            Self {
                broker,
                handle,
                pipeline,
                store,
            }
        }

        fn publish(&self, payload: &'static str) {
            assert!(self.handle.publish(TELEMETRY_TOPIC, payload));
        }

        /// Wait until `n` events have been fully processed
        async fn settle(&self, n: u64) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.pipeline.metrics().snapshot().settled() < n {
                assert!(Instant::now() < deadline, "events did not settle");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        /// Disconnect → drain → close
        async fn stop(mut self, drain: Duration) -> (Arc<MemoryStore>, Result<(), usize>) {
            self.broker
                .disconnect(Duration::from_millis(10))
                .await
                .unwrap();
            let drained = self.pipeline.inflight().drain(drain).await;
            self.store.close().await.unwrap();
            (self.store, drained)
        }
    }

    /// Scenario 1: valid payload → one document
    #[tokio::test]
    async fn test_e2e_valid_event_persisted() {
        let harness = Harness::start(MemoryStore::new()).await;

        harness.publish(SCENARIO_1);
        harness.settle(1).await;

        let records = harness.store.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.device_id, "B1");
        assert_eq!(record.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(record.tire_pressure, vec![30.1, 30.2]);
        assert_eq!(record.seat_rotation, vec![5.0]);
        assert!(!record.brake_engaged);
        assert_eq!(record.acceleration, vec![0.1, 0.2, 9.8]);
        assert_eq!(record.pressure_sensor_reading, 101);

        let doc = to_document(record);
        assert_eq!(doc.get_str(keys::BIKE_ID).unwrap(), "B1");
        assert_eq!(doc.get_i64(keys::KEYES_PRESSURE).unwrap(), 101);
        assert_eq!(doc.get_array(keys::SEAT_TUBE).unwrap().len(), 3);
    }

    /// Scenario 2: heartbeat → nothing written
    #[tokio::test]
    async fn test_e2e_heartbeat_ignored() {
        let harness = Harness::start(MemoryStore::new()).await;

        harness.publish(SCENARIO_2);
        harness.settle(1).await;

        assert!(harness.store.records().is_empty());
        assert_eq!(harness.pipeline.metrics().snapshot().heartbeats, 1);
    }

    /// Scenario 3: null array → decode failure, nothing written
    #[tokio::test]
    async fn test_e2e_invalid_event_dropped() {
        let harness = Harness::start(MemoryStore::new()).await;

        harness.publish(SCENARIO_3);
        harness.publish("not json at all");
        harness.settle(2).await;

        assert!(harness.store.records().is_empty());
        assert_eq!(harness.pipeline.metrics().snapshot().decode_failures, 2);
    }

    /// Scenario 4: store write failure does not stop later events
    #[tokio::test]
    async fn test_e2e_store_failure_isolated() {
        let harness = Harness::start(MemoryStore::new()).await;

        harness.store.set_fail_writes(true);
        harness.publish(SCENARIO_1);
        harness.settle(1).await;

        harness.store.set_fail_writes(false);
        harness.publish(SCENARIO_1);
        harness.settle(2).await;

        let snap = harness.pipeline.metrics().snapshot();
        assert_eq!(snap.persist_failures, 1);
        assert_eq!(snap.records_persisted, 1);
        assert_eq!(harness.store.records().len(), 1);
    }

    /// Redelivery is not deduplicated
    #[tokio::test]
    async fn test_e2e_replay_writes_twice() {
        let harness = Harness::start(MemoryStore::new()).await;

        harness.publish(SCENARIO_1);
        harness.publish(SCENARIO_1);
        harness.settle(2).await;

        assert_eq!(harness.store.records().len(), 2);
    }

    /// Mixed feed: every event settles exactly once
    #[tokio::test]
    async fn test_e2e_mixed_feed() {
        let harness = Harness::start(MemoryStore::new()).await;

        for payload in [SCENARIO_1, SCENARIO_2, SCENARIO_3, SCENARIO_1, SCENARIO_2] {
            harness.publish(payload);
        }
        harness.settle(5).await;

        let snap = harness.pipeline.metrics().snapshot();
        assert_eq!(snap.events_received, 5);
        assert_eq!(snap.records_persisted, 2);
        assert_eq!(snap.heartbeats, 2);
        assert_eq!(snap.decode_failures, 1);
    }

    /// Deliveries are processed concurrently
    #[tokio::test]
    async fn test_e2e_concurrent_delivery() {
        let store = MemoryStore::new();
        store.set_write_delay(Duration::from_millis(100));
        let harness = Harness::start(store).await;

        let start = Instant::now();
        for _ in 0..20 {
            harness.publish(SCENARIO_1);
        }
        harness.settle(20).await;

        // Sequential handling would need 2s.
        assert!(start.elapsed() < Duration::from_millis(1500));
        assert_eq!(harness.store.records().len(), 20);
    }

    /// Shutdown waits for in-flight writes before closing the store
    #[tokio::test]
    async fn test_e2e_shutdown_drains_inflight() {
        let store = MemoryStore::new();
        store.set_write_delay(Duration::from_millis(150));
        let harness = Harness::start(store).await;

        for _ in 0..5 {
            harness.publish(SCENARIO_1);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        let handle = harness.handle.clone();

        let (store, drained) = harness.stop(Duration::from_secs(2)).await;

        assert_eq!(drained, Ok(()));
        assert_eq!(store.records().len(), 5);
        assert!(store.is_closed());
        assert!(!handle.publish(TELEMETRY_TOPIC, SCENARIO_1));
    }

    /// Shutdown straight after a burst: queued and unstarted events still land
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_shutdown_after_burst() {
        let harness = Harness::start(MemoryStore::new()).await;
        let pipeline = harness.pipeline.clone();

        let accepted = (0..2000)
            .filter(|_| harness.handle.publish(TELEMETRY_TOPIC, SCENARIO_1))
            .count();
        let (store, drained) = harness.stop(Duration::from_secs(5)).await;

        let snap = pipeline.metrics().snapshot();
        assert_eq!(drained, Ok(()));
        assert_eq!(accepted, 2000);
        assert_eq!(snap.events_received, accepted as u64);
        assert_eq!(snap.records_persisted, accepted as u64);
        assert_eq!(store.records().len(), accepted);
    }

    /// Flat config file drives the store placement
    #[test]
    fn test_flat_config_defaults() {
        let config = config_loader::ConfigLoader::load_from_str(
            r#"{"mongodb_uri":"mongodb://localhost:27017","username":"rider","password":"pw"}"#,
            config_loader::ConfigFormat::Json,
        )
        .unwrap();
        assert_eq!(config.store.database, "IBSMS");
        assert_eq!(config.store.collection, "bikes_history");
        assert_eq!(config.runtime.connect_timeout_secs, 30);
    }
}
