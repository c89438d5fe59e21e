use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn default_ensemble_members() -> u32 {
    52
}

/// Root of the suite configuration file (JSON or YAML).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastConfigDto {
    pub python_exec: String,
    pub ecflow_home: String,
    #[serde(default)]
    pub ecflow_bin: Option<String>,
    pub workspace: String,
    #[serde(default)]
    pub local_run: bool,
    pub suite: SuiteDto,
    pub scripts_dir: String,
    pub rapid_exec: String,
    pub rapid_exec_dir: String,
    pub rapid_subprocess_dir: String,
    pub forecast_records_dir: String,
    pub nces_exec: String,
    pub aws_config: String,
    /// Explicit basin list. When absent the basins are discovered from `{workspace}/input`.
    #[serde(default)]
    pub basins: Option<Vec<String>>,
    #[serde(default = "default_ensemble_members")]
    pub ensemble_members: u32,
    #[serde(default)]
    pub max_concurrent_jobs: Option<u32>,
    #[serde(default)]
    pub admin_toggles: bool,
    /// Absolute paths of nodes in other suites that must complete before the pipeline starts.
    #[serde(default)]
    pub upstream: Vec<String>,
    /// Replaces the built-in pipeline when present.
    #[serde(default)]
    pub stages: Option<Vec<StageDto>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuiteDto {
    pub name: String,
    pub logs: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutDto {
    Single,
    PerBasin,
    PerBasinMember,
}

/// One entry of the declarative stage table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageDto {
    pub name: String,
    pub fan_out: FanOutDto,
    /// Task name prefix for fan-out stages.
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    /// Script file name, resolved against `scripts_dir`.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub variables: IndexMap<String, String>,
    #[serde(default)]
    pub task_variables: IndexMap<String, String>,
    #[serde(default)]
    pub defused_by: Option<String>,
    #[serde(default)]
    pub throttled: bool,
}
