use std::path::Path;

use crate::api::config_dto::ForecastConfigDto;
use crate::domain::builder::{ForecastSuite, SuiteBuilder};
use crate::domain::definition::{render_definition, save_definition};
use crate::domain::forecast::config::ForecastConfig;
use crate::domain::utils::id::BasinId;
use crate::error::Result;
use crate::loader::parser::{list_subdirectories, parse_config_file};

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads and validates a suite configuration file.
pub fn load_config(file_path: &Path) -> Result<ForecastConfig> {
    let dto: ForecastConfigDto = parse_config_file(file_path)?;
    log::info!("Configuration file '{}' parsed successfully.", file_path.display());

    ForecastConfig::from_dto(dto)
}

/// The configured basins, or the subdirectories of `{workspace}/input` when none are configured.
pub fn discover_basins(config: &ForecastConfig) -> Result<Vec<BasinId>> {
    if let Some(basins) = &config.basins {
        return Ok(basins.clone());
    }

    let input_dir = config.input_dir();
    let basins: Vec<BasinId> = list_subdirectories(&input_dir)?.into_iter().map(BasinId::new).collect();
    if basins.is_empty() {
        log::warn!("No basin directories found in '{}'.", input_dir.display());
    } else {
        log::info!("Discovered {} basin(s) in '{}'.", basins.len(), input_dir.display());
    }
    Ok(basins)
}

pub fn generate_suite(config: &ForecastConfig) -> Result<ForecastSuite> {
    let basins = discover_basins(config)?;
    SuiteBuilder::new(config).build(&basins)
}

/// Builds, validates and renders the suite for `config`.
///
/// Unless `dry_run` is set the definition is also written to `output`, or to
/// `{ecflow_home}/{suite}.def` when no output path is given.
///
/// # Returns
/// The rendered definition text.
pub fn create_definition(config: &ForecastConfig, output: Option<&Path>, dry_run: bool) -> Result<String> {
    let suite = generate_suite(config)?;

    if dry_run {
        log::info!("Dry run: definition is not written.");
        return render_definition(&suite.defs);
    }

    let default_path = config.definition_path();
    save_definition(&suite.defs, output.unwrap_or(&default_path))
}
