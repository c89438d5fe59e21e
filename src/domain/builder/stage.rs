use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::api::config_dto::{FanOutDto, StageDto};
use crate::domain::builder::admin::AdminToggle;
use crate::domain::utils::id::{BasinId, job_id};
use crate::error::{Error, Result};

/// How many tasks a stage expands into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// One task at suite (or group) level.
    Single,
    /// One task per basin inside the stage family.
    PerBasin,
    /// One task per basin and ensemble member inside the stage family.
    PerBasinMember,
}

impl FanOut {
    pub fn from_dto(dto: FanOutDto) -> Self {
        match dto {
            FanOutDto::Single => FanOut::Single,
            FanOutDto::PerBasin => FanOut::PerBasin,
            FanOutDto::PerBasinMember => FanOut::PerBasinMember,
        }
    }

    fn placeholders(self) -> &'static [&'static str] {
        match self {
            FanOut::Single => &[],
            FanOut::PerBasin => &["{basin}"],
            FanOut::PerBasinMember => &["{basin}", "{member}", "{job_id}"],
        }
    }
}

/// Executables and directories the stages hand to their scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub scripts_dir: PathBuf,
    pub rapid_exec: String,
    pub rapid_exec_dir: String,
    pub rapid_subprocess_dir: String,
    pub forecast_records_dir: String,
    pub nces_exec: String,
    pub aws_config: String,
}

impl ToolPaths {
    pub fn script(&self, file_name: &str) -> String {
        self.scripts_dir.join(file_name).display().to_string()
    }
}

/// The ensemble members run for every basin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsembleLayout {
    pub members: u32,
}

impl EnsembleLayout {
    pub fn new(members: u32) -> Self {
        EnsembleLayout { members }
    }

    /// The high-resolution control member is the highest ensemble number.
    pub fn high_res_member(&self) -> u32 {
        self.members
    }

    /// Members in processing order: high-resolution first, then the perturbed members downwards.
    pub fn canonical_order(&self) -> Vec<u32> {
        (1..=self.members).rev().collect()
    }
}

impl Default for EnsembleLayout {
    fn default() -> Self {
        EnsembleLayout::new(52)
    }
}

/// One stage of the pipeline, as consumed by the suite builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Name of the gate node: the family for fan-out stages, the task for single stages.
    pub name: String,
    /// Task name prefix for fan-out stages.
    pub task: String,
    pub fan_out: FanOut,
    /// Stages that must complete before this one starts.
    pub after: Vec<String>,
    /// Grouping family the stage is placed in, created on first use.
    pub group: Option<String>,
    /// Declared once on the gate node.
    pub variables: IndexMap<String, String>,
    /// Declared on every generated task, with `{basin}`, `{member}` and `{job_id}` expanded.
    pub task_variables: IndexMap<String, String>,
    pub defused_by: Option<AdminToggle>,
    /// Consumes the suite-wide job limit.
    pub throttled: bool,
}

impl StageSpec {
    pub fn new(name: &str, fan_out: FanOut) -> Self {
        StageSpec {
            name: name.to_string(),
            task: name.to_string(),
            fan_out,
            after: Vec::new(),
            group: None,
            variables: IndexMap::new(),
            task_variables: IndexMap::new(),
            defused_by: None,
            throttled: false,
        }
    }

    pub fn with_task(mut self, task: &str) -> Self {
        self.task = task.to_string();
        self
    }

    pub fn after(mut self, predecessor: &str) -> Self {
        self.after.push(predecessor.to_string());
        self
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn variable(mut self, key: &str, value: impl Into<String>) -> Self {
        self.variables.insert(key.to_string(), value.into());
        self
    }

    pub fn task_variable(mut self, key: &str, template: impl Into<String>) -> Self {
        self.task_variables.insert(key.to_string(), template.into());
        self
    }

    pub fn defused_by(mut self, toggle: AdminToggle) -> Self {
        self.defused_by = Some(toggle);
        self
    }

    pub fn throttled(mut self) -> Self {
        self.throttled = true;
        self
    }

    /// Converts a configured stage, validating everything that can be checked in isolation.
    /// `index` is the stage's position, used in error key paths.
    pub fn from_dto(dto: StageDto, index: usize, scripts_dir: &Path) -> Result<Self> {
        let key = |field: &str| format!("stages[{}].{}", index, field);

        if !is_valid_node_name(&dto.name) {
            return Err(Error::config(key("name"), format!("'{}' is not a valid node name", dto.name)));
        }
        let fan_out = FanOut::from_dto(dto.fan_out);

        let task = match (fan_out, dto.task) {
            (FanOut::Single, None) => dto.name.clone(),
            (FanOut::Single, Some(_)) => return Err(Error::config(key("task"), "single stages are named by 'name' only")),
            (_, None) => return Err(Error::config(key("task"), "fan-out stages need a task name prefix")),
            (_, Some(task)) if !is_valid_node_name(&task) => {
                return Err(Error::config(key("task"), format!("'{}' is not a valid node name", task)));
            }
            (_, Some(task)) => task,
        };

        for (variable, template) in &dto.task_variables {
            if let Some(placeholder) = unsupported_placeholder(template, fan_out) {
                return Err(Error::config(
                    key(&format!("task_variables.{}", variable)),
                    format!("placeholder {} is not available for this fan-out", placeholder),
                ));
            }
        }

        let defused_by = match dto.defused_by {
            Some(event) => Some(
                AdminToggle::from_event_name(&event)
                    .ok_or_else(|| Error::config(key("defused_by"), format!("unknown admin toggle '{}'", event)))?,
            ),
            None => None,
        };

        let mut variables = IndexMap::new();
        if let Some(script) = dto.script {
            variables.insert("PYSCRIPT".to_string(), scripts_dir.join(script).display().to_string());
        }
        variables.extend(dto.variables);

        Ok(StageSpec {
            name: dto.name,
            task,
            fan_out,
            after: dto.after,
            group: dto.group,
            variables,
            task_variables: dto.task_variables,
            defused_by,
            throttled: dto.throttled,
        })
    }

    /// Name of the task generated for one work unit. Basin ids are sanitized for node names.
    pub fn task_name(&self, basin: &BasinId, member: Option<u32>) -> String {
        match member {
            Some(member) => format!("{}_{}_{}", self.task, node_name(basin.as_str()), member),
            None => format!("{}_{}", self.task, node_name(basin.as_str())),
        }
    }
}

fn unsupported_placeholder(template: &str, fan_out: FanOut) -> Option<&'static str> {
    ["{basin}", "{member}", "{job_id}"]
        .into_iter()
        .find(|placeholder| template.contains(placeholder) && !fan_out.placeholders().contains(placeholder))
}

/// Fills `{basin}`, `{member}` and `{job_id}` into a task variable template.
pub fn expand_template(template: &str, basin: &BasinId, member: Option<u32>) -> String {
    let mut value = template.replace("{basin}", basin.as_str());
    if let Some(member) = member {
        value = value.replace("{member}", &member.to_string()).replace("{job_id}", job_id(basin.as_str(), member).as_str());
    }
    value
}

/// Maps an arbitrary identifier onto the node name alphabet by replacing every other
/// character with `_`.
pub fn node_name(raw: &str) -> String {
    raw.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' }).collect()
}

/// Node names start with a letter, digit or underscore and continue with those or dots.
pub fn is_valid_node_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    }
}

/// The operational GEOGLOWS pipeline: preparation, ensemble run, three post-processing
/// stages and archival, each gated on its predecessor.
pub fn default_pipeline(tools: &ToolPaths, admin_toggles: bool, throttle: bool) -> Vec<StageSpec> {
    let mut rapid = StageSpec::new("ensemble_family", FanOut::PerBasinMember)
        .with_task("ens")
        .after("prep_task")
        .variable("PYSCRIPT", tools.script("run_rapid_forecast.py"))
        .variable("RAPID_EXEC", tools.rapid_exec.as_str())
        .variable("EXEC_DIR", tools.rapid_exec_dir.as_str())
        .variable("SUBPROCESS_DIR", tools.rapid_subprocess_dir.as_str())
        .task_variable("JOB_ID", "{job_id}");
    if throttle {
        rapid = rapid.throttled();
    }

    let mut esri_table = StageSpec::new("esri_table_family", FanOut::PerBasin)
        .with_task("esri_table")
        .after("ensemble_family")
        .variable("PYSCRIPT", tools.script("generate_esri_table.py"))
        .variable("NCES_EXEC", tools.nces_exec.as_str())
        .task_variable("VPU", "{basin}");

    let nc_to_zarr = StageSpec::new("nc_to_zarr_family", FanOut::PerBasin)
        .with_task("nc_to_zarr")
        .after("esri_table_family")
        .variable("PYSCRIPT", tools.script("netcdf_to_zarr.py"))
        .task_variable("VPU", "{basin}");

    let init_flows = StageSpec::new("init_flows_family", FanOut::PerBasin)
        .with_task("init_flows")
        .after("nc_to_zarr_family")
        .variable("PYSCRIPT", tools.script("compute_init_flows.py"))
        .task_variable("VPU", "{basin}");

    let mut day_one = StageSpec::new("day_one_family", FanOut::PerBasin)
        .with_task("day_one")
        .after("init_flows_family")
        .variable("PYSCRIPT", tools.script("day_one_forecast.py"))
        .task_variable("VPU", "{basin}")
        .task_variable("OUTPUT_DIR", tools.forecast_records_dir.as_str());

    let mut aws = StageSpec::new("aws_family", FanOut::PerBasin)
        .with_task("aws")
        .after("day_one_family")
        .variable("PYSCRIPT", tools.script("archive_to_aws.py"))
        .variable("AWS_CONFIG", tools.aws_config.as_str())
        .task_variable("VPU", "{basin}");

    if admin_toggles {
        esri_table = esri_table.defused_by(AdminToggle::NoPostprocess);
        day_one = day_one.defused_by(AdminToggle::NoPostprocess);
        aws = aws.defused_by(AdminToggle::NoArchive);
    }

    let prep = StageSpec::new("prep_task", FanOut::Single).variable("PYSCRIPT", tools.script("prep_rapid_forecast.py"));

    vec![prep, rapid, esri_table, nc_to_zarr, init_flows, day_one, aws]
}
