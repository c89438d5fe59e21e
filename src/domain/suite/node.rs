use indexmap::IndexMap;

use crate::domain::suite::NodeId;
use crate::domain::trigger::{BoolExpr, NodeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Suite,
    Family,
    Task,
}

impl NodeKind {
    /// Suites and families may own children, tasks may not.
    pub fn is_container(self) -> bool {
        !matches!(self, NodeKind::Task)
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            NodeKind::Suite => "suite",
            NodeKind::Family => "family",
            NodeKind::Task => "task",
        }
    }
}

/// A node consumes one token of the limit `name` declared on `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InLimit {
    pub owner: NodeId,
    pub name: String,
}

/// One suite, family or task. Nodes live in the [`Defs`](crate::domain::suite::Defs) arena
/// and are only mutated through it, which keeps parent and child links consistent.
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) kind: NodeKind,
    pub(super) name: String,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) variables: IndexMap<String, String>,
    pub(super) trigger: BoolExpr,
    pub(super) defuser: BoolExpr,
    pub(super) defstatus: Option<NodeState>,
    pub(super) events: Vec<String>,
    pub(super) limits: IndexMap<String, u32>,
    pub(super) inlimits: Vec<InLimit>,
}

impl Node {
    pub(super) fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Node {
            kind,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            variables: IndexMap::new(),
            trigger: BoolExpr::Empty,
            defuser: BoolExpr::Empty,
            defstatus: None,
            events: Vec::new(),
            limits: IndexMap::new(),
            inlimits: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Variables declared on this node only, in insertion order.
    pub fn variables(&self) -> &IndexMap<String, String> {
        &self.variables
    }

    /// The trigger, or `None` when no trigger has been set.
    pub fn trigger(&self) -> Option<&BoolExpr> {
        (!self.trigger.is_empty()).then_some(&self.trigger)
    }

    /// The completion condition (`complete` line), or `None` when unset.
    pub fn defuser(&self) -> Option<&BoolExpr> {
        (!self.defuser.is_empty()).then_some(&self.defuser)
    }

    pub fn defstatus(&self) -> Option<NodeState> {
        self.defstatus
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|event| event == name)
    }

    pub fn limits(&self) -> &IndexMap<String, u32> {
        &self.limits
    }

    pub fn inlimits(&self) -> &[InLimit] {
        &self.inlimits
    }
}
