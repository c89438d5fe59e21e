use slotmap::{SlotMap, new_key_type};

use crate::domain::suite::node::{InLimit, Node, NodeKind};
use crate::domain::trigger::{BoolExpr, NodeState};
use crate::error::{Error, Result};

new_key_type! {
    pub struct NodeId;
}

/// The complete definition: an arena of nodes, the suites rooted in it and the externs
/// the definition depends on.
///
/// Every node is created detached and then attached with [`Defs::add_child`]. All methods
/// taking a `NodeId` panic if the id does not belong to this arena.
#[derive(Debug, Clone, Default)]
pub struct Defs {
    nodes: SlotMap<NodeId, Node>,
    suites: Vec<NodeId>,
    externs: Vec<String>,
}

impl Defs {
    pub fn new() -> Self {
        Self::default()
    }

    //----------------------
    // --- Construction ---
    //----------------------
    pub fn add_suite(&mut self, name: &str) -> Result<NodeId> {
        if self.find_suite(name).is_some() {
            return Err(Error::DuplicateNameError { parent: "/".to_string(), name: name.to_string() });
        }
        let suite = self.nodes.insert(Node::new(NodeKind::Suite, name));
        self.suites.push(suite);
        Ok(suite)
    }

    /// Creates a family that is not attached to any parent yet.
    pub fn new_family(&mut self, name: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Family, name))
    }

    /// Creates a task that is not attached to any parent yet.
    pub fn new_task(&mut self, name: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Task, name))
    }

    pub fn add_family(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        let family = self.new_family(name);
        self.add_child(parent, family)?;
        Ok(family)
    }

    pub fn add_task(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        let task = self.new_task(name);
        self.add_child(parent, task)?;
        Ok(task)
    }

    /// Attaches `child` below `parent`.
    ///
    /// Re-adding a child to its current parent is a no-op. A child that already has a
    /// different parent is moved, so a node never appears in two places.
    ///
    /// # Errors
    /// - `Error::HierarchyError` if `parent` is a task, `child` is a suite, or `parent`
    ///   lies inside the subtree of `child`.
    /// - `Error::DuplicateNameError` if `parent` already owns another node with the same name.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.nodes[parent].kind.is_container() {
            return Err(Error::HierarchyError(format!(
                "task '{}' cannot own '{}'",
                self.abs_path(parent),
                self.nodes[child].name
            )));
        }
        if self.nodes[child].kind == NodeKind::Suite {
            return Err(Error::HierarchyError(format!("suite '{}' cannot be nested", self.nodes[child].name)));
        }
        if self.nodes[child].parent == Some(parent) {
            return Ok(());
        }
        if self.descends_from(parent, child) {
            return Err(Error::HierarchyError(format!(
                "'{}' cannot be placed inside its own subtree at '{}'",
                self.abs_path(child),
                self.abs_path(parent)
            )));
        }
        if self.find_child(parent, &self.nodes[child].name).is_some() {
            return Err(Error::DuplicateNameError { parent: self.abs_path(parent), name: self.nodes[child].name.clone() });
        }

        if let Some(previous) = self.nodes[child].parent {
            log::debug!("Moving '{}' below '{}'.", self.abs_path(child), self.abs_path(parent));
            self.nodes[previous].children.retain(|id| *id != child);
        }
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    //---------------------
    // --- Attributes ---
    //---------------------

    /// Sets a variable on `id`, replacing an earlier value for the same key in place.
    pub fn add_variable(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        self.nodes[id].variables.insert(key.to_string(), value.into());
    }

    /// Looks `key` up on `id` and then on each ancestor, nearest first.
    pub fn variable(&self, id: NodeId, key: &str) -> Option<&str> {
        self.lineage(id).into_iter().find_map(|node| self.nodes[node].variables.get(key)).map(String::as_str)
    }

    pub fn set_trigger(&mut self, id: NodeId, expr: BoolExpr) {
        self.nodes[id].trigger = expr;
    }

    /// Conjoins `expr` with the existing trigger.
    pub fn and_trigger(&mut self, id: NodeId, expr: BoolExpr) {
        self.nodes[id].trigger &= expr;
    }

    pub fn set_defuser(&mut self, id: NodeId, expr: BoolExpr) {
        self.nodes[id].defuser = expr;
    }

    /// Declares an event. Declaring the same event twice keeps a single entry.
    pub fn add_event(&mut self, id: NodeId, name: &str) {
        if !self.nodes[id].has_event(name) {
            self.nodes[id].events.push(name.to_string());
        }
    }

    pub fn set_defstatus(&mut self, id: NodeId, state: NodeState) {
        self.nodes[id].defstatus = Some(state);
    }

    /// Declares a limit with `tokens` slots on `id`.
    pub fn add_limit(&mut self, id: NodeId, name: &str, tokens: u32) {
        self.nodes[id].limits.insert(name.to_string(), tokens);
    }

    /// Makes `id` consume one token of the limit `name` declared on `owner`.
    pub fn add_inlimit(&mut self, id: NodeId, owner: NodeId, name: &str) {
        self.nodes[id].inlimits.push(InLimit { owner, name: name.to_string() });
    }

    /// Registers an absolute path of a node defined outside this definition.
    pub fn add_extern(&mut self, path: &str) {
        if !self.externs.iter().any(|existing| existing == path) {
            self.externs.push(path.to_string());
        }
    }

    //------------------
    // --- Queries ---
    //------------------
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn suites(&self) -> &[NodeId] {
        &self.suites
    }

    pub fn externs(&self) -> &[String] {
        &self.externs
    }

    pub fn find_suite(&self, name: &str) -> Option<NodeId> {
        self.suites.iter().copied().find(|suite| self.nodes[*suite].name == name)
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent].children.iter().copied().find(|child| self.nodes[*child].name == name)
    }

    /// `id` followed by its ancestors, up to and including the root.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut lineage = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            lineage.push(parent);
            current = parent;
        }
        lineage
    }

    /// True if `ancestor` is `id` itself or one of its ancestors.
    pub fn descends_from(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.lineage(id).contains(&ancestor)
    }

    /// The deepest node that is an ancestor of both `a` and `b` (each node counts as its
    /// own ancestor), or `None` if they live in different trees.
    pub fn mrca(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        self.lineage(a).into_iter().find(|candidate| self.descends_from(b, *candidate))
    }

    /// Every node of the subtree rooted at `id`, in pre-order.
    pub fn walk(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        order
    }

    /// Total number of nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
