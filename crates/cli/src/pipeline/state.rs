//! Estimator snapshot persistence
//!
//! The snapshot is a pretty-printed JSON `SyncSnapshot`. A missing file
//! means a fresh estimator; an undecodable one is reported and ignored.

use std::io::ErrorKind;
use std::path::Path;

use contracts::{SyncConfig, SyncSnapshot};
use sync_engine::ApHubSync;
use tracing::{info, warn};

use crate::error::{CliError, Result};

/// Build the estimator for a run, resuming from `path` when possible
pub fn load_estimator(path: Option<&Path>, config: SyncConfig) -> Result<ApHubSync> {
    let Some(path) = path else {
        return Ok(ApHubSync::new(config));
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "No saved sync state, starting fresh");
            return Ok(ApHubSync::new(config));
        }
        Err(e) => return Err(CliError::state_file(path, e)),
    };

    match serde_json::from_str::<SyncSnapshot>(&content) {
        Ok(snapshot) => {
            info!(
                path = %path.display(),
                phase = %snapshot.phase,
                delta = snapshot.delta_estimate_ns,
                "Sync state restored"
            );
            Ok(ApHubSync::restore(config, &snapshot))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid sync state, starting fresh");
            Ok(ApHubSync::new(config))
        }
    }
}

/// Persist the estimator state
pub fn save_snapshot(path: &Path, snapshot: &SyncSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CliError::state_file(path, e))?;
    }

    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| CliError::state_file(path, std::io::Error::other(e)))?;
    std::fs::write(path, json).map_err(|e| CliError::state_file(path, e))?;

    info!(path = %path.display(), phase = %snapshot.phase, "Sync state saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SyncPhase;

    #[test]
    fn test_no_path_is_fresh() {
        let estimator = load_estimator(None, SyncConfig::default()).unwrap();
        assert_eq!(estimator.phase(), SyncPhase::NotInited);
    }

    #[test]
    fn test_missing_file_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let estimator = load_estimator(Some(&path), SyncConfig::default()).unwrap();
        assert_eq!(estimator.phase(), SyncPhase::NotInited);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut estimator = ApHubSync::default();
        estimator.add_sample(1_000_000_000, 999_990_000);
        estimator.add_sample(2_000_000_001, 1_999_990_001);
        save_snapshot(&path, &estimator.snapshot()).unwrap();

        let restored = load_estimator(Some(&path), SyncConfig::default()).unwrap();
        assert_eq!(restored.phase(), SyncPhase::UseFiltered);
        assert_eq!(restored.get_delta(0), estimator.get_delta(0));
    }

    #[test]
    fn test_unknown_phase_code_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut json = serde_json::to_value(ApHubSync::default().snapshot()).unwrap();
        json["phase"] = serde_json::json!(7);
        std::fs::write(&path, json.to_string()).unwrap();

        let estimator = load_estimator(Some(&path), SyncConfig::default()).unwrap();
        assert_eq!(estimator.phase(), SyncPhase::NotInited);
    }

    #[test]
    fn test_garbage_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(load_estimator(Some(&path), SyncConfig::default()).is_ok());
    }
}
