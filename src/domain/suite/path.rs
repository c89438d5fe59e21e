use crate::domain::suite::node::NodeKind;
use crate::domain::suite::{Defs, NodeId};

impl Defs {
    /// Slash separated path from the root, e.g. `/suite/family/task`.
    pub fn abs_path(&self, id: NodeId) -> String {
        let names: Vec<&str> = self.lineage(id).into_iter().rev().map(|node| self.node(node).name()).collect();
        format!("/{}", names.join("/"))
    }

    /// Path of `target` as written in an expression attached to `attachment`.
    ///
    /// Nodes whose closest common ancestor is the suite itself are addressed absolutely.
    /// Otherwise the shortest `..`-relative form is used, falling back to the absolute path
    /// whenever that form would climb more than one level.
    ///
    /// # Returns
    /// `None` if `target` and `attachment` share no ancestor.
    pub fn path_relative_to(&self, target: NodeId, attachment: NodeId) -> Option<String> {
        let common = self.mrca(target, attachment)?;
        let target_path = self.abs_path(target);
        if self.node(common).kind() == NodeKind::Suite {
            return Some(target_path);
        }
        Some(relative_path(&target_path, &self.abs_path(attachment)))
    }

    /// Finds the node a path written on `attachment` refers to.
    ///
    /// Absolute paths start at the suites. Relative paths are read from the parent of
    /// `attachment`, where `..` climbs one level and any other component names a child.
    pub fn resolve_path(&self, attachment: NodeId, path: &str) -> Option<NodeId> {
        if let Some(absolute) = path.strip_prefix('/') {
            let mut components = absolute.split('/').filter(|component| !component.is_empty());
            let mut current = self.find_suite(components.next()?)?;
            for component in components {
                current = self.find_child(current, component)?;
            }
            return Some(current);
        }

        let mut current = self.node(attachment).parent()?;
        for component in path.split('/') {
            current = match component {
                "" | "." => current,
                ".." => self.node(current).parent()?,
                name => self.find_child(current, name)?,
            };
        }
        Some(current)
    }
}

/// Relative form of `path` as seen from the directory containing `start`.
fn relative_path(path: &str, start: &str) -> String {
    let basename = path.rsplit('/').next().unwrap_or(path);
    if path == start {
        return basename.to_string();
    }

    let target: Vec<&str> = path.split('/').filter(|component| !component.is_empty()).collect();
    let mut start_dir: Vec<&str> = start.split('/').filter(|component| !component.is_empty()).collect();
    start_dir.pop();

    let common = target.iter().zip(start_dir.iter()).take_while(|(a, b)| a == b).count();
    let ups = start_dir.len() - common;
    let remainder = &target[common..];

    if ups == 0 && remainder.is_empty() {
        return format!("../{}", basename);
    }
    if ups >= 2 || remainder.is_empty() {
        return path.to_string();
    }

    let mut components = vec![".."; ups];
    components.extend_from_slice(remainder);
    components.join("/")
}
