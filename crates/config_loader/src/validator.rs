//! Configuration validation
//!
//! Rules:
//! - filter coefficients: `0 < filter_a <= filter_b`
//! - window_timeout_ns > 0, expiration_ns >= window_timeout_ns
//! - mock source: positive duration, interval, start time and sensor rates;
//!   unique sensor ids
//! - replay source: non-empty path
//! - sink names non-empty and unique

use std::collections::HashSet;

use contracts::{
    ContractError, HubSyncBlueprint, MockSourceConfig, ReplaySourceConfig, SourceConfig,
    SyncConfig,
};

/// Validate a blueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &HubSyncBlueprint) -> Result<(), ContractError> {
    validate_sync_config(&blueprint.sync)?;
    match &blueprint.source {
        SourceConfig::Mock(mock) => validate_mock_source(mock)?,
        SourceConfig::Replay(replay) => validate_replay_source(replay)?,
    }
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_sync_config(sync: &SyncConfig) -> Result<(), ContractError> {
    if sync.filter_b == 0 {
        return Err(ContractError::config_validation(
            "sync.filter_b",
            "filter_b must be > 0",
        ));
    }
    if sync.filter_a == 0 || sync.filter_a > sync.filter_b {
        return Err(ContractError::config_validation(
            "sync.filter_a",
            format!(
                "filter_a ({}) must be in 1..={}",
                sync.filter_a, sync.filter_b
            ),
        ));
    }
    if sync.window_timeout_ns == 0 {
        return Err(ContractError::config_validation(
            "sync.window_timeout_ns",
            "window_timeout_ns must be > 0",
        ));
    }
    if sync.expiration_ns < sync.window_timeout_ns {
        return Err(ContractError::config_validation(
            "sync.expiration_ns",
            format!(
                "expiration_ns ({}) must be >= window_timeout_ns ({})",
                sync.expiration_ns, sync.window_timeout_ns
            ),
        ));
    }
    Ok(())
}

fn validate_mock_source(mock: &MockSourceConfig) -> Result<(), ContractError> {
    let positive = [
        ("source.duration_ns", mock.duration_ns),
        ("source.sync_interval_ns", mock.sync_interval_ns),
        // a zero AP reading is the "no sample yet" marker
        ("source.hub_start_ns", mock.hub_start_ns),
    ];
    for (field, value) in positive {
        if value == 0 {
            return Err(ContractError::config_validation(field, "must be > 0"));
        }
    }

    let mut seen = HashSet::new();
    for sensor in &mock.sensors {
        if !seen.insert(sensor.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("source.sensors[id={}]", sensor.id),
                "duplicate sensor_id",
            ));
        }
        if !(sensor.rate_hz.is_finite() && sensor.rate_hz > 0.0) {
            return Err(ContractError::config_validation(
                format!("source.sensors[{}].rate_hz", sensor.id),
                format!("rate_hz must be > 0, got {}", sensor.rate_hz),
            ));
        }
    }
    Ok(())
}

fn validate_replay_source(replay: &ReplaySourceConfig) -> Result<(), ContractError> {
    if replay.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "source.path",
            "replay path cannot be empty",
        ));
    }
    Ok(())
}

fn validate_sinks(blueprint: &HubSyncBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MockSensorConfig, SinkConfig, SinkType};
    use std::path::PathBuf;

    fn minimal_blueprint() -> HubSyncBlueprint {
        HubSyncBlueprint::with_mock_source(MockSourceConfig {
            sensors: vec![MockSensorConfig {
                id: "accel".into(),
                rate_hz: 100.0,
            }],
            ..Default::default()
        })
    }

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_filter_b_zero() {
        let mut bp = minimal_blueprint();
        bp.sync.filter_b = 0;
        assert_eq!(field_of(validate(&bp).unwrap_err()), "sync.filter_b");
    }

    #[test]
    fn test_filter_a_above_b() {
        let mut bp = minimal_blueprint();
        bp.sync.filter_a = 9;
        assert_eq!(field_of(validate(&bp).unwrap_err()), "sync.filter_a");

        bp.sync.filter_a = 0;
        assert_eq!(field_of(validate(&bp).unwrap_err()), "sync.filter_a");
    }

    #[test]
    fn test_filter_a_equal_b_allowed() {
        let mut bp = minimal_blueprint();
        bp.sync.filter_a = 8;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_window_timeout() {
        let mut bp = minimal_blueprint();
        bp.sync.window_timeout_ns = 0;
        assert_eq!(
            field_of(validate(&bp).unwrap_err()),
            "sync.window_timeout_ns"
        );
    }

    #[test]
    fn test_expiration_shorter_than_window() {
        let mut bp = minimal_blueprint();
        bp.sync.expiration_ns = bp.sync.window_timeout_ns - 1;
        assert_eq!(field_of(validate(&bp).unwrap_err()), "sync.expiration_ns");
    }

    #[test]
    fn test_mock_intervals_must_be_positive() {
        let mut bp = minimal_blueprint();
        if let SourceConfig::Mock(mock) = &mut bp.source {
            mock.sync_interval_ns = 0;
        }
        assert_eq!(
            field_of(validate(&bp).unwrap_err()),
            "source.sync_interval_ns"
        );
    }

    #[test]
    fn test_sensor_rate_and_duplicates() {
        let mut bp = minimal_blueprint();
        if let SourceConfig::Mock(mock) = &mut bp.source {
            mock.sensors[0].rate_hz = 0.0;
        }
        assert!(validate(&bp).is_err());

        let mut bp = minimal_blueprint();
        if let SourceConfig::Mock(mock) = &mut bp.source {
            mock.sensors.push(mock.sensors[0].clone());
        }
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_replay_path() {
        let mut bp = minimal_blueprint();
        bp.source = SourceConfig::Replay(ReplaySourceConfig {
            path: PathBuf::new(),
        });
        assert_eq!(field_of(validate(&bp).unwrap_err()), "source.path");
    }

    #[test]
    fn test_sink_names() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name.clear();
        assert_eq!(field_of(validate(&bp).unwrap_err()), "sinks[0].name");

        let mut bp = minimal_blueprint();
        bp.sinks.push(SinkConfig {
            name: "log".into(),
            sink_type: SinkType::File,
            queue_capacity: 10,
            params: Default::default(),
        });
        assert!(validate(&bp)
            .unwrap_err()
            .to_string()
            .contains("duplicate sink name"));
    }
}
