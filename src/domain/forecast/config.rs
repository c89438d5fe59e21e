use std::collections::HashSet;
use std::path::PathBuf;

use crate::api::config_dto::ForecastConfigDto;
use crate::domain::builder::stage::{EnsembleLayout, StageSpec, ToolPaths, default_pipeline, is_valid_node_name};
use crate::domain::utils::id::BasinId;
use crate::error::{Error, Result};

/// Whether the work is fanned out by an external scheduler or serialized on one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Distributed,
    Local,
}

/// Fully validated suite configuration.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub suite_name: String,
    pub suite_logs: PathBuf,
    pub python_exec: String,
    pub ecflow_home: PathBuf,
    pub ecflow_bin: Option<String>,
    pub workspace: PathBuf,
    pub mode: RunMode,
    pub tools: ToolPaths,
    /// `None` means the basins are discovered from the workspace at build time.
    pub basins: Option<Vec<BasinId>>,
    pub ensemble: EnsembleLayout,
    pub max_concurrent_jobs: Option<u32>,
    pub admin_toggles: bool,
    /// Foreign nodes gating the first stages, declared as externs.
    pub upstream: Vec<String>,
    pub stages: Vec<StageSpec>,
}

impl ForecastConfig {
    /// Validates the raw configuration. Stops at the first problem and reports it with
    /// its key path.
    pub fn from_dto(dto: ForecastConfigDto) -> Result<Self> {
        let mode = if dto.local_run { RunMode::Local } else { RunMode::Distributed };

        let suite_name = required("suite.name", dto.suite.name)?;
        if !is_valid_node_name(&suite_name) {
            return Err(Error::config("suite.name", format!("'{}' is not a valid node name", suite_name)));
        }
        let suite_logs = required("suite.logs", dto.suite.logs)?;
        let python_exec = required("python_exec", dto.python_exec)?;
        let ecflow_home = required("ecflow_home", dto.ecflow_home)?;
        let workspace = required("workspace", dto.workspace)?;

        let ecflow_bin = match (mode, dto.ecflow_bin) {
            (RunMode::Local, None) => return Err(Error::config("ecflow_bin", "required when local_run is set")),
            (_, Some(bin)) => Some(required("ecflow_bin", bin)?),
            (RunMode::Distributed, None) => None,
        };

        let tools = ToolPaths {
            scripts_dir: PathBuf::from(required("scripts_dir", dto.scripts_dir)?),
            rapid_exec: required("rapid_exec", dto.rapid_exec)?,
            rapid_exec_dir: required("rapid_exec_dir", dto.rapid_exec_dir)?,
            rapid_subprocess_dir: required("rapid_subprocess_dir", dto.rapid_subprocess_dir)?,
            forecast_records_dir: required("forecast_records_dir", dto.forecast_records_dir)?,
            nces_exec: required("nces_exec", dto.nces_exec)?,
            aws_config: required("aws_config", dto.aws_config)?,
        };

        if dto.ensemble_members == 0 {
            return Err(Error::config("ensemble_members", "must be at least 1"));
        }
        if dto.max_concurrent_jobs == Some(0) {
            return Err(Error::config("max_concurrent_jobs", "must be at least 1"));
        }

        let basins = dto.basins.map(validate_basins).transpose()?;
        let upstream = validate_upstream(dto.upstream)?;

        let stages = match dto.stages {
            Some(stages) => stages
                .into_iter()
                .enumerate()
                .map(|(index, stage)| StageSpec::from_dto(stage, index, &tools.scripts_dir))
                .collect::<Result<Vec<_>>>()?,
            None => default_pipeline(&tools, dto.admin_toggles, dto.max_concurrent_jobs.is_some()),
        };
        validate_stages(&stages, dto.admin_toggles, dto.max_concurrent_jobs.is_some())?;

        log::debug!("Configuration for suite '{}' validated with {} stage(s).", suite_name, stages.len());

        Ok(ForecastConfig {
            suite_name,
            suite_logs: PathBuf::from(suite_logs),
            python_exec,
            ecflow_home: PathBuf::from(ecflow_home),
            ecflow_bin,
            workspace: PathBuf::from(workspace),
            mode,
            tools,
            basins,
            ensemble: EnsembleLayout::new(dto.ensemble_members),
            max_concurrent_jobs: dto.max_concurrent_jobs,
            admin_toggles: dto.admin_toggles,
            upstream,
            stages,
        })
    }

    /// Per-basin RAPID input directories live below this directory.
    pub fn input_dir(&self) -> PathBuf {
        self.workspace.join("input")
    }

    /// Where `create` writes the definition unless told otherwise.
    pub fn definition_path(&self) -> PathBuf {
        self.ecflow_home.join(format!("{}.def", self.suite_name))
    }
}

fn required(key: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::config(key, "must not be empty"));
    }
    Ok(value)
}

/// Checks an explicit basin list: ids must be non-empty, free of `/` and whitespace, and unique.
pub fn validate_basins(raw: Vec<String>) -> Result<Vec<BasinId>> {
    let mut seen = HashSet::new();
    let mut basins = Vec::with_capacity(raw.len());

    for (index, basin) in raw.into_iter().enumerate() {
        let key = format!("basins[{}]", index);
        if basin.is_empty() {
            return Err(Error::config(key, "basin id must not be empty"));
        }
        if basin.contains('/') || basin.chars().any(char::is_whitespace) {
            return Err(Error::config(key, format!("basin id '{}' must not contain '/' or whitespace", basin)));
        }
        if !seen.insert(basin.clone()) {
            return Err(Error::config(key, format!("basin id '{}' is listed twice", basin)));
        }
        basins.push(BasinId::new(basin));
    }

    Ok(basins)
}

/// Checks the upstream node paths: absolute, naming a node below a suite, free of whitespace.
pub fn validate_upstream(raw: Vec<String>) -> Result<Vec<String>> {
    for (index, path) in raw.iter().enumerate() {
        let components: Vec<&str> = path.strip_prefix('/').unwrap_or_default().split('/').collect();
        if !path.starts_with('/') || components.len() < 2 || components.iter().any(|c| !is_valid_node_name(c)) {
            return Err(Error::config(format!("upstream[{}]", index), format!("'{}' is not an absolute node path", path)));
        }
    }
    Ok(raw)
}

/// Checks the relations between stages: unique names, predecessors declared earlier,
/// toggles and throttling only when the suite provides them.
pub fn validate_stages(stages: &[StageSpec], admin_toggles: bool, throttle_available: bool) -> Result<()> {
    let mut declared: HashSet<&str> = HashSet::new();

    for (index, stage) in stages.iter().enumerate() {
        let key = |field: &str| format!("stages[{}].{}", index, field);

        for predecessor in &stage.after {
            if !declared.contains(predecessor.as_str()) {
                let reason = if predecessor == &stage.name {
                    "a stage cannot follow itself".to_string()
                } else if stages.iter().any(|other| &other.name == predecessor) {
                    format!("'{}' is declared after this stage", predecessor)
                } else {
                    format!("unknown stage '{}'", predecessor)
                };
                return Err(Error::config(key("after"), reason));
            }
        }
        if stage.defused_by.is_some() && !admin_toggles {
            return Err(Error::config(key("defused_by"), "requires admin_toggles"));
        }
        if stage.throttled && !throttle_available {
            return Err(Error::config(key("throttled"), "requires max_concurrent_jobs"));
        }
        if stage.group.as_deref().is_some_and(|group| !is_valid_node_name(group)) {
            return Err(Error::config(key("group"), "not a valid node name"));
        }
        if !declared.insert(stage.name.as_str()) {
            return Err(Error::config(key("name"), format!("stage '{}' is declared twice", stage.name)));
        }
    }

    Ok(())
}
