use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use crate::domain::suite::{Defs, NodeId};

/// Binding strength of a rendered sub-expression. A child whose rank is lower than its
/// parent's gets wrapped in parentheses.
const RANK_OR: u8 = 1;
const RANK_AND: u8 = 2;
const RANK_NOT: u8 = 3;
const RANK_RELATION: u8 = 4;
const RANK_OPERAND: u8 = 99;

/// Run states an ecFlow node can be in, as they appear in trigger text and `defstatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Unknown,
    Complete,
    Queued,
    Aborted,
    Submitted,
    Suspended,
    Active,
}

impl NodeState {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeState::Unknown => "unknown",
            NodeState::Complete => "complete",
            NodeState::Queued => "queued",
            NodeState::Aborted => "aborted",
            NodeState::Submitted => "submitted",
            NodeState::Suspended => "suspended",
            NodeState::Active => "active",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
}

impl Relation {
    pub const fn symbol(self) -> &'static str {
        match self {
            Relation::Eq => "==",
            Relation::Ne => "!=",
        }
    }
}

/// A boolean condition over node states, events and literals.
///
/// `Empty` is the identity of both `and` and `or`: combining anything with it yields the
/// other operand unchanged, and it renders to the empty string. Node references are arena
/// keys and only become path text when the expression is rendered against the node it is
/// attached to, so the same expression can be built before its nodes are placed in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoolExpr {
    #[default]
    Empty,
    Literal(String),
    State {
        node: NodeId,
        state: NodeState,
    },
    Event {
        node: NodeId,
        name: String,
    },
    Compare {
        relation: Relation,
        left: Box<BoolExpr>,
        right: Box<BoolExpr>,
    },
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Not(Box<BoolExpr>),
}

/// Result of comparing two expressions.
///
/// Two literals are decided immediately. Anything involving a node reference has to be
/// evaluated by the scheduler and stays a deferred expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Static(bool),
    Deferred(BoolExpr),
}

impl BoolExpr {
    pub fn literal(text: impl Into<String>) -> Self {
        BoolExpr::Literal(text.into())
    }

    /// A condition that always holds.
    pub fn always() -> Self {
        BoolExpr::literal("1==1")
    }

    /// A condition that never holds. Used to keep a node queued until it is set by hand.
    pub fn never() -> Self {
        BoolExpr::literal("1==0")
    }

    pub fn state(node: NodeId, state: NodeState) -> Self {
        BoolExpr::State { node, state }
    }

    pub fn complete(node: NodeId) -> Self {
        BoolExpr::state(node, NodeState::Complete)
    }

    pub fn aborted(node: NodeId) -> Self {
        BoolExpr::state(node, NodeState::Aborted)
    }

    pub fn event(node: NodeId, name: impl Into<String>) -> Self {
        BoolExpr::Event { node, name: name.into() }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BoolExpr::Empty)
    }

    pub fn and(self, other: BoolExpr) -> Self {
        match (self, other) {
            (BoolExpr::Empty, expr) | (expr, BoolExpr::Empty) => expr,
            (left, right) => BoolExpr::And(Box::new(left), Box::new(right)),
        }
    }

    pub fn or(self, other: BoolExpr) -> Self {
        match (self, other) {
            (BoolExpr::Empty, expr) | (expr, BoolExpr::Empty) => expr,
            (left, right) => BoolExpr::Or(Box::new(left), Box::new(right)),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            BoolExpr::Empty => BoolExpr::Empty,
            expr => BoolExpr::Not(Box::new(expr)),
        }
    }

    pub fn equals(self, other: BoolExpr) -> Comparison {
        self.compare(Relation::Eq, other)
    }

    pub fn not_equals(self, other: BoolExpr) -> Comparison {
        self.compare(Relation::Ne, other)
    }

    fn compare(self, relation: Relation, other: BoolExpr) -> Comparison {
        match (&self, &other) {
            (BoolExpr::Literal(left), BoolExpr::Literal(right)) => {
                let equal = left == right;
                Comparison::Static(if relation == Relation::Eq { equal } else { !equal })
            }
            _ => Comparison::Deferred(BoolExpr::Compare { relation, left: Box::new(self), right: Box::new(other) }),
        }
    }

    /// Every node referenced by this expression, in first-seen order, without duplicates.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.visit(&mut |expr| {
            if let BoolExpr::State { node, .. } | BoolExpr::Event { node, .. } = expr {
                if !found.contains(node) {
                    found.push(*node);
                }
            }
        });
        found
    }

    /// Every `(node, event name)` pair referenced by this expression.
    pub fn events(&self) -> Vec<(NodeId, &str)> {
        let mut found = Vec::new();
        self.visit(&mut |expr| {
            if let BoolExpr::Event { node, name } = expr {
                found.push((*node, name.as_str()));
            }
        });
        found
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a BoolExpr)) {
        f(self);
        match self {
            BoolExpr::Compare { left, right, .. } | BoolExpr::And(left, right) | BoolExpr::Or(left, right) => {
                left.visit(f);
                right.visit(f);
            }
            BoolExpr::Not(operand) => operand.visit(f),
            BoolExpr::Empty | BoolExpr::Literal(_) | BoolExpr::State { .. } | BoolExpr::Event { .. } => {}
        }
    }

    /// Renders the expression as ecFlow trigger text, with node paths relative to `attachment`.
    ///
    /// # Returns
    /// The trigger text, or an empty string when the expression is empty or every operand
    /// refers to a node that shares no ancestor with `attachment`.
    pub fn render(&self, defs: &Defs, attachment: NodeId) -> String {
        self.render_ranked(defs, attachment).map(|(text, _)| text).unwrap_or_default()
    }

    fn render_ranked(&self, defs: &Defs, attachment: NodeId) -> Option<(String, u8)> {
        match self {
            BoolExpr::Empty => None,
            BoolExpr::Literal(text) => (!text.is_empty()).then(|| (text.clone(), RANK_OPERAND)),
            BoolExpr::State { node, state } => {
                let path = defs.path_relative_to(*node, attachment)?;
                Some((format!("{} == {}", path, state), RANK_RELATION))
            }
            BoolExpr::Event { node, name } => {
                let path = defs.path_relative_to(*node, attachment)?;
                Some((format!("{}:{}", path, name), RANK_OPERAND))
            }
            BoolExpr::Compare { relation, left, right } => {
                let (left_text, left_rank) = left.render_ranked(defs, attachment)?;
                let (right_text, right_rank) = right.render_ranked(defs, attachment)?;
                let text = format!(
                    "{} {} {}",
                    parenthesize(left_text, left_rank, RANK_RELATION),
                    relation.symbol(),
                    parenthesize(right_text, right_rank, RANK_RELATION)
                );
                Some((text, RANK_RELATION))
            }
            BoolExpr::And(left, right) => render_binary(left, right, "and", RANK_AND, defs, attachment),
            BoolExpr::Or(left, right) => render_binary(left, right, "or", RANK_OR, defs, attachment),
            BoolExpr::Not(operand) => {
                let (text, rank) = operand.render_ranked(defs, attachment)?;
                Some((format!("not {}", parenthesize(text, rank, RANK_NOT)), RANK_NOT))
            }
        }
    }
}

fn render_binary(left: &BoolExpr, right: &BoolExpr, keyword: &str, rank: u8, defs: &Defs, attachment: NodeId) -> Option<(String, u8)> {
    match (left.render_ranked(defs, attachment), right.render_ranked(defs, attachment)) {
        (None, None) => None,
        (Some(side), None) | (None, Some(side)) => Some(side),
        (Some((left_text, left_rank)), Some((right_text, right_rank))) => {
            let text = format!("{} {} {}", parenthesize(left_text, left_rank, rank), keyword, parenthesize(right_text, right_rank, rank));
            Some((text, rank))
        }
    }
}

fn parenthesize(text: String, inner_rank: u8, outer_rank: u8) -> String {
    if inner_rank < outer_rank { format!("({})", text) } else { text }
}

/// Conjunction of `complete` conditions on every given node. Empty input yields `BoolExpr::Empty`.
pub fn all_complete<I: IntoIterator<Item = NodeId>>(nodes: I) -> BoolExpr {
    nodes.into_iter().fold(BoolExpr::Empty, |acc, node| acc & BoolExpr::complete(node))
}

impl BitAnd for BoolExpr {
    type Output = BoolExpr;

    fn bitand(self, rhs: BoolExpr) -> BoolExpr {
        self.and(rhs)
    }
}

impl BitOr for BoolExpr {
    type Output = BoolExpr;

    fn bitor(self, rhs: BoolExpr) -> BoolExpr {
        self.or(rhs)
    }
}

impl Not for BoolExpr {
    type Output = BoolExpr;

    fn not(self) -> BoolExpr {
        self.negate()
    }
}

impl BitAndAssign for BoolExpr {
    fn bitand_assign(&mut self, rhs: BoolExpr) {
        *self = std::mem::take(self).and(rhs);
    }
}

impl BitOrAssign for BoolExpr {
    fn bitor_assign(&mut self, rhs: BoolExpr) {
        *self = std::mem::take(self).or(rhs);
    }
}
