use std::collections::HashMap;

use crate::domain::builder::admin::add_admin_family;
use crate::domain::builder::stage::{FanOut, StageSpec, expand_template};
use crate::domain::forecast::config::{ForecastConfig, RunMode};
use crate::domain::suite::{Defs, NodeId};
use crate::domain::trigger::{BoolExpr, NodeState, all_complete};
use crate::domain::utils::id::{BasinId, job_id};
use crate::error::{Error, Result, ValidationIssue};

/// Name of the suite-level limit throttled stages consume.
pub const JOB_LIMIT: &str = "rapid";

/// A built definition together with the suite it was built for.
#[derive(Debug, Clone)]
pub struct ForecastSuite {
    pub defs: Defs,
    pub suite: NodeId,
}

impl ForecastSuite {
    /// Gate node of the stage called `name`, looked up below the suite and its groups.
    pub fn stage(&self, name: &str) -> Option<NodeId> {
        self.defs.walk(self.suite).into_iter().skip(1).find(|id| self.defs.node(*id).name() == name)
    }
}

/// Wires the configured stages into one suite.
///
/// Construction is fail-slow for name collisions: every sibling collision is collected and
/// reported together as `Error::ValidationError` once all stages have been built.
pub struct SuiteBuilder<'a> {
    config: &'a ForecastConfig,
}

/// One (basin, member) or basin-only slot of a fan-out stage.
struct WorkUnit<'b> {
    basin: &'b BasinId,
    member: Option<u32>,
}

impl<'a> SuiteBuilder<'a> {
    pub fn new(config: &'a ForecastConfig) -> Self {
        SuiteBuilder { config }
    }

    pub fn build(&self, basins: &[BasinId]) -> Result<ForecastSuite> {
        log::info!(
            "Building suite '{}' for {} basin(s) in {:?} mode.",
            self.config.suite_name,
            basins.len(),
            self.config.mode
        );

        // Phase 1: Suite with its shared variables
        let mut defs = Defs::new();
        let suite = defs.add_suite(&self.config.suite_name)?;
        self.add_suite_variables(&mut defs, suite);
        for path in &self.config.upstream {
            defs.add_extern(path);
        }

        // Phase 2: Optional admin toggles and job limit
        let toggles = if self.config.admin_toggles { Some(add_admin_family(&mut defs, suite)?) } else { None };
        if let Some(tokens) = self.config.max_concurrent_jobs {
            defs.add_limit(suite, JOB_LIMIT, tokens);
        }

        // Phase 3: Stages, each gated on its predecessors
        let mut issues = Vec::new();
        let mut gates: HashMap<&str, NodeId> = HashMap::new();
        let mut groups: HashMap<&str, NodeId> = HashMap::new();

        for stage in &self.config.stages {
            let container = match stage.group.as_deref() {
                Some(group) => match groups.get(group) {
                    Some(family) => *family,
                    None => {
                        let family = defs.new_family(group);
                        attach(&mut defs, suite, family, &mut issues)?;
                        groups.insert(group, family);
                        family
                    }
                },
                None => suite,
            };

            let gate = self.add_stage(&mut defs, container, stage, basins, &mut issues)?;

            let predecessors: Vec<NodeId> = stage.after.iter().filter_map(|name| gates.get(name.as_str()).copied()).collect();
            defs.set_trigger(gate, all_complete(predecessors));
            if stage.after.is_empty() {
                for path in &self.config.upstream {
                    defs.and_trigger(gate, BoolExpr::literal(format!("{} == {}", path, NodeState::Complete)));
                }
            }

            if let (Some(toggle), Some(toggles)) = (stage.defused_by, toggles) {
                defs.set_defuser(gate, BoolExpr::event(toggles, toggle.event_name()));
            }
            if stage.throttled {
                defs.add_inlimit(gate, suite, JOB_LIMIT);
            }

            gates.insert(stage.name.as_str(), gate);
        }

        if !issues.is_empty() {
            log::error!("Suite '{}' has {} name collision(s).", self.config.suite_name, issues.len());
            return Err(Error::ValidationError(issues));
        }

        log::info!("Suite '{}' built with {} node(s).", self.config.suite_name, defs.walk(suite).len());
        Ok(ForecastSuite { defs, suite })
    }

    fn add_suite_variables(&self, defs: &mut Defs, suite: NodeId) {
        let home = self.config.ecflow_home.display().to_string();
        let ecf_bin = match self.config.mode {
            RunMode::Local => self.config.ecflow_bin.clone().unwrap_or_default(),
            RunMode::Distributed => String::new(),
        };

        defs.add_variable(suite, "ECF_INCLUDE", home.as_str());
        defs.add_variable(suite, "ECF_FILES", self.config.ecflow_home.join(&self.config.suite_name).display().to_string());
        defs.add_variable(suite, "ECF_HOME", home);
        defs.add_variable(suite, "ECF_BIN", ecf_bin);
        defs.add_variable(suite, "WORKSPACE", self.config.workspace.display().to_string());
        defs.add_variable(suite, "PYTHON_EXEC", self.config.python_exec.as_str());
        defs.add_variable(suite, "LOG_DIR", self.config.suite_logs.display().to_string());
    }

    /// Adds one stage below `container` and returns its gate node.
    fn add_stage(
        &self,
        defs: &mut Defs,
        container: NodeId,
        stage: &StageSpec,
        basins: &[BasinId],
        issues: &mut Vec<ValidationIssue>,
    ) -> Result<NodeId> {
        if stage.fan_out == FanOut::Single {
            let task = defs.new_task(&stage.name);
            for (key, value) in stage.variables.iter().chain(stage.task_variables.iter()) {
                defs.add_variable(task, key, value.as_str());
            }
            attach(defs, container, task, issues)?;
            return Ok(task);
        }

        let family = defs.new_family(&stage.name);
        for (key, value) in &stage.variables {
            defs.add_variable(family, key, value.as_str());
        }
        attach(defs, container, family, issues)?;

        let units = self.work_units(stage.fan_out, basins);
        let mut previous: Option<NodeId> = None;

        for unit in &units {
            let task = defs.new_task(&stage.task_name(unit.basin, unit.member));
            for (key, template) in &stage.task_variables {
                defs.add_variable(task, key, expand_template(template, unit.basin, unit.member));
            }
            if let Some(member) = unit.member {
                if !stage.task_variables.contains_key("JOB_ID") {
                    defs.add_variable(task, "JOB_ID", job_id(unit.basin.as_str(), member).id);
                }
            }

            // Local runs serialize the whole stage in canonical order.
            if let (RunMode::Local, Some(previous)) = (self.config.mode, previous) {
                defs.set_trigger(task, BoolExpr::complete(previous));
            }

            attach(defs, family, task, issues)?;
            previous = Some(task);
        }

        log::debug!("Stage '{}' expanded into {} task(s).", stage.name, units.len());
        Ok(family)
    }

    /// Work units in canonical order: basins as given, members high-resolution first.
    fn work_units<'b>(&self, fan_out: FanOut, basins: &'b [BasinId]) -> Vec<WorkUnit<'b>> {
        let members = self.config.ensemble.canonical_order();
        match fan_out {
            FanOut::Single => Vec::new(),
            FanOut::PerBasin => basins.iter().map(|basin| WorkUnit { basin, member: None }).collect(),
            FanOut::PerBasinMember => basins
                .iter()
                .flat_map(|basin| members.iter().map(move |member| WorkUnit { basin, member: Some(*member) }))
                .collect(),
        }
    }
}

/// Attaches `child` below `parent`, recording a sibling collision as an issue instead of failing.
fn attach(defs: &mut Defs, parent: NodeId, child: NodeId, issues: &mut Vec<ValidationIssue>) -> Result<()> {
    match defs.add_child(parent, child) {
        Ok(()) => Ok(()),
        Err(Error::DuplicateNameError { parent, name }) => {
            log::warn!("Duplicate node name '{}' below '{}'.", name, parent);
            issues.push(ValidationIssue::new(format!("{}/{}", parent, name), "duplicate sibling name"));
            Ok(())
        }
        Err(e) => Err(e),
    }
}
