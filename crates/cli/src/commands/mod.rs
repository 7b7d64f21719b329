//! Command implementations.

mod info;
mod record;
mod run;
mod validate;

pub use info::run_info;
pub use record::run_record;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use contracts::HubSyncBlueprint;

use crate::error::CliError;

/// Load a blueprint, failing early on a missing file
pub(crate) fn load_blueprint(path: &Path) -> anyhow::Result<HubSyncBlueprint> {
    use anyhow::Context;

    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
