//! # Integration Tests
//!
//! Cross-crate tests for the AP-Hub sync workspace.
//!
//! Covers:
//! - Contract round trips through the config loader
//! - Estimator behavior on synthetic sessions (no hardware)
//! - End-to-end mock source -> sync engine -> dispatcher

#[cfg(test)]
mod contract_tests {
    use contracts::{HubSyncBlueprint, MockSensorConfig, MockSourceConfig, SyncPhase};

    #[test]
    fn test_sync_phase_codes() {
        for phase in [SyncPhase::NotInited, SyncPhase::UseMax, SyncPhase::UseFiltered] {
            let code: u8 = phase.into();
            assert_eq!(SyncPhase::try_from(code).unwrap(), phase);
        }
        let err = SyncPhase::try_from(9).unwrap_err();
        assert_eq!(err.to_string(), "invalid sync state 9");
    }

    #[test]
    fn test_blueprint_survives_toml_round_trip() {
        let blueprint = HubSyncBlueprint::with_mock_source(MockSourceConfig {
            true_offset_ns: -42_000,
            sensors: vec![MockSensorConfig {
                id: "baro".to_string(),
                rate_hz: 25.0,
            }],
            ..Default::default()
        });

        let toml = config_loader::ConfigLoader::to_toml(&blueprint).unwrap();
        let parsed =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        assert_eq!(parsed.sync, blueprint.sync);
        assert_eq!(parsed.sensor_ids(), vec!["baro"]);
        assert_eq!(parsed.sinks.len(), 1);
    }
}

#[cfg(test)]
mod estimator_tests {
    use contracts::{
        ms_in_ns, s_in_ns, ClockJump, HubEvent, MockSensorConfig, MockSourceConfig,
        SampleOutcome, SleepWindow, SyncConfig, SyncPhase,
    };
    use ingestion::MockTimeline;
    use sync_engine::{ApHubSync, HubSyncEngine, SharedApHubSync};

    const OFFSET: i64 = 2_000_000;

    fn session(duration_s: u64) -> MockSourceConfig {
        MockSourceConfig {
            duration_ns: s_in_ns(duration_s),
            sync_interval_ns: ms_in_ns(100),
            true_offset_ns: OFFSET,
            sensors: vec![MockSensorConfig {
                id: "accel".to_string(),
                rate_hz: 50.0,
            }],
            ..Default::default()
        }
    }

    /// Feed a whole timeline, returning every pair outcome in order
    fn drive(engine: &mut HubSyncEngine, timeline: MockTimeline) -> Vec<SampleOutcome> {
        let mut outcomes = Vec::new();
        for event in timeline {
            match event {
                HubEvent::TimeSync(pair) => outcomes.push(engine.on_time_sync(pair)),
                other => {
                    engine.handle(other);
                }
            }
        }
        outcomes
    }

    #[test]
    fn test_noise_free_session_converges_exactly() {
        let mut engine = HubSyncEngine::new(SyncConfig::default());
        let outcomes = drive(&mut engine, MockTimeline::new(session(5)));

        let closures = outcomes
            .iter()
            .filter(|o| matches!(o, SampleOutcome::WindowClosed { .. }))
            .count();
        assert!(closures >= 2, "only {closures} windows closed");
        assert_eq!(engine.phase(), SyncPhase::UseFiltered);
        assert_eq!(engine.current_delta(), OFFSET);
    }

    #[test]
    fn test_latency_never_overshoots_true_offset() {
        let mut engine = HubSyncEngine::new(SyncConfig::default());
        let config = MockSourceConfig {
            max_latency_ns: 50_000,
            seed: 7,
            ..session(10)
        };
        drive(&mut engine, MockTimeline::new(config));

        let delta = engine.current_delta();
        assert!(delta <= OFFSET, "estimate {delta} above true offset");
        assert!(delta >= OFFSET - 50_001, "estimate {delta} too low");
    }

    #[test]
    fn test_hub_clock_jump_is_rejected_then_reanchored() {
        let mut engine = HubSyncEngine::new(SyncConfig::default());
        let config = MockSourceConfig {
            jump: Some(ClockJump {
                at_ns: ms_in_ns(1_500),
                hub_step_ns: s_in_ns(3) as i64,
            }),
            ..session(4)
        };

        let mut estimate_before_jump = None;
        let mut outcomes = Vec::new();
        for event in MockTimeline::new(config) {
            if let HubEvent::TimeSync(pair) = event {
                let outcome = engine.on_time_sync(pair);
                if outcome == SampleOutcome::AbnormalDetected {
                    estimate_before_jump = Some(engine.current_delta());
                }
                if outcome.is_rejected() {
                    assert_eq!(Some(engine.current_delta()), estimate_before_jump);
                }
                outcomes.push(outcome);
            }
        }

        let detected = outcomes
            .iter()
            .position(|o| *o == SampleOutcome::AbnormalDetected)
            .unwrap();
        let reanchored = outcomes
            .iter()
            .position(|o| *o == SampleOutcome::Reanchored)
            .unwrap();
        assert_eq!(estimate_before_jump, Some(OFFSET));
        // Pairs at 1.6s..=2.5s stay inside the one second cooldown
        assert_eq!(reanchored - detected, 11);
        assert!(outcomes[detected + 1..reanchored]
            .iter()
            .all(|o| *o == SampleOutcome::AbnormalPending));
        assert_eq!(engine.stats().reanchored, 1);
    }

    #[test]
    fn test_ap_sleep_keeps_learned_offset() {
        let mut engine = HubSyncEngine::new(SyncConfig::default());
        let config = MockSourceConfig {
            ap_sleep: Some(SleepWindow {
                at_ns: s_in_ns(2),
                duration_ns: ms_in_ns(500),
            }),
            ..session(5)
        };
        let outcomes = drive(&mut engine, MockTimeline::new(config));

        let stats = engine.stats();
        assert_eq!(stats.ap_sleeps, 1);
        assert_eq!(stats.ap_wakes, 1);
        assert!(outcomes.iter().all(|o| !o.is_rejected()));
        assert_eq!(engine.current_delta(), OFFSET);
    }

    #[test]
    fn test_snapshot_restores_identical_estimator() {
        let mut original = ApHubSync::default();
        for event in MockTimeline::new(session(3)) {
            if let HubEvent::TimeSync(pair) = event {
                original.add_sample(pair.ap_time_ns, pair.hub_time_ns);
            }
        }

        let json = serde_json::to_string(&original.snapshot()).unwrap();
        let snapshot = serde_json::from_str(&json).unwrap();
        let restored = ApHubSync::restore(SyncConfig::default(), &snapshot);
        assert_eq!(restored.snapshot(), original.snapshot());

        let shared = SharedApHubSync::from_estimator(restored);
        assert_eq!(shared.get_delta(0), OFFSET);
        assert_eq!(shared.phase(), SyncPhase::UseFiltered);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::BufRead;

    use contracts::{
        apply_offset, ms_in_ns, s_in_ns, ApSensorEvent, HubEvent, MockSensorConfig,
        MockSourceConfig, SinkConfig, SinkType, SyncConfig,
    };
    use dispatcher::create_dispatcher;
    use ingestion::{MockHubSource, MockTimeline, TraceReplaySource, TraceWriter};
    use sync_engine::HubSyncEngine;
    use tokio::sync::mpsc;

    fn session() -> MockSourceConfig {
        MockSourceConfig {
            duration_ns: s_in_ns(3),
            sync_interval_ns: ms_in_ns(100),
            true_offset_ns: 4_000_000,
            max_latency_ns: 20_000,
            seed: 11,
            sensors: vec![
                MockSensorConfig {
                    id: "accel".to_string(),
                    rate_hz: 20.0,
                },
                MockSensorConfig {
                    id: "gyro".to_string(),
                    rate_hz: 10.0,
                },
            ],
            ..Default::default()
        }
    }

    /// End-to-end test: MockHubSource -> HubSyncEngine -> Dispatcher -> FileSink
    #[tokio::test]
    async fn test_e2e_mock_pipeline_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out").join("events.jsonl");

        let (ap_tx, ap_rx) = mpsc::channel::<ApSensorEvent>(64);
        let sink_configs = vec![
            SinkConfig {
                name: "file".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 256,
                params: HashMap::from([(
                    "path".to_string(),
                    out_path.display().to_string(),
                )]),
            },
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 256,
                params: HashMap::new(),
            },
        ];
        let dispatcher = create_dispatcher(sink_configs, ap_rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let source = MockHubSource::new(session());
        let mut hub_rx = source.start(64, None);

        let mut engine = HubSyncEngine::new(SyncConfig::default());
        let mut stamped = 0u64;
        while let Some(event) = hub_rx.recv().await {
            if let Some(ap_event) = engine.handle(event) {
                ap_tx.send(ap_event).await.unwrap();
                stamped += 1;
            }
        }
        drop(ap_tx);

        let sinks = tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sinks.len(), 2);
        for (name, metrics) in &sinks {
            assert_eq!(metrics.write_count, stamped, "sink {name}");
            assert_eq!(metrics.dropped_count, 0, "sink {name}");
        }

        // 61 accel + 31 gyro samples over an inclusive 3s session
        assert_eq!(stamped, 92);
        assert_eq!(engine.stats().sensor_events, 92);

        let file = std::fs::File::open(&out_path).unwrap();
        let events: Vec<ApSensorEvent> = std::io::BufReader::new(file)
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect();
        assert_eq!(events.len() as u64, stamped);
        // Only the t=0 samples can beat the first delayed pair
        assert!(events.iter().filter(|e| !e.calibrated).count() <= 2);
        for event in &events {
            assert_eq!(
                event.ap_time_ns,
                apply_offset(event.hub_time_ns, event.delta_ns)
            );
            assert_eq!(event.values.len(), 3);
        }
    }

    /// A recorded trace replays to the same estimator state as the live timeline
    #[tokio::test]
    async fn test_recorded_trace_replays_identically() {
        let dir = tempfile::tempdir().unwrap();
        let trace_path = dir.path().join("trace.jsonl");

        let mut writer = TraceWriter::create(&trace_path).unwrap();
        let mut live = HubSyncEngine::new(SyncConfig::default());
        for event in MockTimeline::new(session()) {
            writer.write(&event).unwrap();
            live.handle(event);
        }
        writer.flush().unwrap();

        let source = TraceReplaySource::load(&trace_path).unwrap();
        assert_eq!(source.len() as u64, writer.written());

        let mut rx = source.start(8);
        let mut replayed = HubSyncEngine::new(SyncConfig::default());
        let mut pairs = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, HubEvent::TimeSync(_)) {
                pairs += 1;
            }
            replayed.handle(event);
        }

        assert_eq!(pairs, 31);
        assert_eq!(replayed.snapshot(), live.snapshot());
        assert_eq!(replayed.stats(), live.stats());
    }
}

#[cfg(test)]
mod observability_tests {
    use observability::{LogFormat, ObservabilityConfig};

    #[test]
    fn test_init_without_metrics_endpoint() {
        let config = ObservabilityConfig {
            log_format: LogFormat::Compact,
            metrics_port: None,
            default_log_level: "warn".to_string(),
        };
        observability::init_with_config(config).unwrap();

        // Recorders are no-ops without an installed exporter
        observability::record_delta_estimate(1_000);
    }
}
