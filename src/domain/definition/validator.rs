use std::collections::HashSet;

use crate::domain::builder::stage::is_valid_node_name;
use crate::domain::suite::{Defs, NodeId};
use crate::domain::trigger::BoolExpr;
use crate::error::ValidationIssue;

/// Checks every suite in `defs` for structural problems.
///
/// Nothing stops at the first finding: the returned list holds every issue, each tagged
/// with the absolute path of the node it was found on. An empty list means the definition
/// can be rendered.
pub fn check(defs: &Defs) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for &suite in defs.suites() {
        for id in defs.walk(suite) {
            check_node(defs, id, &mut issues);
        }
    }

    if !issues.is_empty() {
        log::debug!("Validation found {} issue(s).", issues.len());
    }
    issues
}

fn check_node(defs: &Defs, id: NodeId, issues: &mut Vec<ValidationIssue>) {
    let node = defs.node(id);
    let path = defs.abs_path(id);

    if !is_valid_node_name(node.name()) {
        issues.push(ValidationIssue::new(&path, format!("invalid node name '{}'", node.name())));
    }

    for (key, value) in node.variables() {
        if !is_quotable(value) {
            issues.push(ValidationIssue::new(&path, format!("variable '{}' has a value with a single quote or line break", key)));
        }
    }

    let mut seen = HashSet::new();
    for &child in node.children() {
        let name = defs.node(child).name();
        if !seen.insert(name) {
            issues.push(ValidationIssue::new(&path, format!("duplicate child name '{}'", name)));
        }
    }

    if let Some(trigger) = node.trigger() {
        check_expression(defs, id, &path, "trigger", trigger, issues);
    }
    if let Some(defuser) = node.defuser() {
        check_expression(defs, id, &path, "complete", defuser, issues);
    }

    for inlimit in node.inlimits() {
        if defs.path_relative_to(inlimit.owner, id).is_none() {
            issues.push(ValidationIssue::new(&path, format!("inlimit '{}' refers to a node outside this suite", inlimit.name)));
        } else if !defs.node(inlimit.owner).limits().contains_key(&inlimit.name) {
            issues.push(ValidationIssue::new(
                &path,
                format!("inlimit '{}' is not declared on '{}'", inlimit.name, defs.abs_path(inlimit.owner)),
            ));
        }
    }
}

fn check_expression(defs: &Defs, id: NodeId, path: &str, label: &str, expr: &BoolExpr, issues: &mut Vec<ValidationIssue>) {
    // Operands sharing no ancestor with `id` render empty and are dropped from the text.
    for referenced in expr.nodes() {
        if let Some(written) = defs.path_relative_to(referenced, id) {
            if defs.resolve_path(id, &written) != Some(referenced) {
                let target = defs.abs_path(referenced);
                issues.push(ValidationIssue::new(path, format!("{} path '{}' does not resolve to '{}'", label, written, target)));
            }
        }
    }

    for (owner, event) in expr.events() {
        if !defs.node(owner).has_event(event) {
            issues.push(ValidationIssue::new(path, format!("{} uses undeclared event '{}:{}'", label, defs.abs_path(owner), event)));
        }
    }
}

/// Variable values are written between single quotes, which the grammar cannot escape.
fn is_quotable(value: &str) -> bool {
    !value.contains(['\'', '\n', '\r'])
}
