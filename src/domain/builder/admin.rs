use crate::domain::suite::{Defs, NodeId};
use crate::domain::trigger::BoolExpr;
use crate::error::Result;

pub const ADMIN_FAMILY: &str = "admin";
pub const TOGGLES_TASK: &str = "toggles";

/// Operator switches. Setting the event on the toggles task defuses the stages bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminToggle {
    NoArchive,
    NoPostprocess,
}

impl AdminToggle {
    pub const ALL: [AdminToggle; 2] = [AdminToggle::NoArchive, AdminToggle::NoPostprocess];

    pub const fn event_name(self) -> &'static str {
        match self {
            AdminToggle::NoArchive => "no_archive",
            AdminToggle::NoPostprocess => "no_postprocess",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        AdminToggle::ALL.into_iter().find(|toggle| toggle.event_name() == name)
    }
}

/// Adds `family admin` with a `toggles` task that never runs on its own, completes
/// immediately and carries one event per [`AdminToggle`].
///
/// # Returns
/// The toggles task, which defuse expressions refer to.
pub fn add_admin_family(defs: &mut Defs, suite: NodeId) -> Result<NodeId> {
    let family = defs.add_family(suite, ADMIN_FAMILY)?;
    let toggles = defs.add_task(family, TOGGLES_TASK)?;

    defs.set_trigger(toggles, BoolExpr::never());
    defs.set_defuser(toggles, BoolExpr::always());
    for toggle in AdminToggle::ALL {
        defs.add_event(toggles, toggle.event_name());
    }

    log::debug!("Added admin toggles at '{}'.", defs.abs_path(toggles));
    Ok(toggles)
}
