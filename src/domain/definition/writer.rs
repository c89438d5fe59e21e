use std::path::Path;

use crate::domain::definition::validator;
use crate::domain::suite::{Defs, NodeId, NodeKind};
use crate::domain::utils::fs::write_atomic;
use crate::error::{Error, Result};

const INDENT: &str = "  ";

/// Validates `defs` and renders it in the ecFlow definition grammar.
///
/// # Returns
/// The definition text, or `Error::ValidationError` with every issue found.
pub fn render_definition(defs: &Defs) -> Result<String> {
    let issues = validator::check(defs);
    if !issues.is_empty() {
        return Err(Error::ValidationError(issues));
    }

    let mut lines = Vec::new();
    for path in defs.externs() {
        lines.push(format!("extern {}", path));
    }
    for &suite in defs.suites() {
        write_node(defs, suite, 0, &mut lines);
    }

    let mut text = lines.join("\n");
    text.push('\n');
    Ok(text)
}

/// Renders `defs` and writes it to `path` atomically. Nothing is written if validation fails.
///
/// # Returns
/// The text that was written.
pub fn save_definition(defs: &Defs, path: &Path) -> Result<String> {
    let text = render_definition(defs)?;
    write_atomic(path, text.as_bytes())?;
    log::info!("Saved definition to '{}'.", path.display());
    Ok(text)
}

fn write_node(defs: &Defs, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    let node = defs.node(id);
    let indent = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);

    lines.push(format!("{}{} {}", indent, node.kind().keyword(), node.name()));

    if let Some(state) = node.defstatus() {
        lines.push(format!("{}defstatus {}", inner, state));
    }
    if let Some(defuser) = node.defuser() {
        let text = defuser.render(defs, id);
        if !text.is_empty() {
            lines.push(format!("{}complete {}", inner, text));
        }
    }
    if let Some(trigger) = node.trigger() {
        let text = trigger.render(defs, id);
        if !text.is_empty() {
            lines.push(format!("{}trigger {}", inner, text));
        }
    }
    for (key, value) in node.variables() {
        lines.push(format!("{}edit {} '{}'", inner, key, value));
    }
    for (name, tokens) in node.limits() {
        lines.push(format!("{}limit {} {}", inner, name, tokens));
    }
    for inlimit in node.inlimits() {
        if let Some(owner) = defs.path_relative_to(inlimit.owner, id) {
            lines.push(format!("{}inlimit {}:{}", inner, owner, inlimit.name));
        }
    }
    for event in node.events() {
        lines.push(format!("{}event {}", inner, event));
    }

    for &child in node.children() {
        write_node(defs, child, depth + 1, lines);
    }

    match node.kind() {
        NodeKind::Suite => lines.push(format!("{}endsuite", indent)),
        NodeKind::Family => lines.push(format!("{}endfamily", indent)),
        NodeKind::Task => {}
    }
}
