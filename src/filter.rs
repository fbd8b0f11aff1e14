//! Tree filters producing the modified-lines, modified-files, indirect and
//! file-name subsets of a metric tree.
//!
//! Every filter returns a new tree. Ancestors on the path to a kept node are
//! copied without their own values, so their aggregates are recomputed from
//! the kept children only.

use std::collections::BTreeSet;

use crate::metric::{Metric, NodeKind};
use crate::node::{FileData, Node};

/// Metrics that are measured per source line and therefore recomputed from
/// the selected lines of a file.
const LINE_METRICS: [Metric; 3] = [Metric::Line, Metric::Branch, Metric::Instruction];

impl Node {
    /// Files restricted to their modified lines that carry coverage. Files
    /// with no such line are pruned.
    pub fn filter_by_modified_lines(&self) -> Node {
        self.filter_files(&|file| {
            let lines = file.file_data()?.modified_lines_with_coverage();
            (!lines.is_empty()).then(|| restrict_to_lines(file, &lines))
        })
    }

    /// Complete copies of all files with at least one modified line.
    pub fn filter_by_modified_files(&self) -> Node {
        self.filter_files(&|file| {
            let data = file.file_data()?;
            (!data.modified_lines.is_empty()).then(|| file.clone())
        })
    }

    /// Files restricted to the lines whose coverage changed without the line
    /// itself being modified.
    pub fn filter_by_indirect_changes(&self) -> Node {
        self.filter_files(&|file| {
            let data = file.file_data()?;
            let lines: BTreeSet<u32> = data.indirect_changes.keys().copied().collect();
            (!lines.is_empty()).then(|| restrict_to_lines(file, &lines))
        })
    }

    /// Complete copies of the files whose relative path is in `names`.
    pub fn filter_by_file_names(&self, names: &BTreeSet<String>) -> Node {
        self.filter_files(&|file| {
            let path = file.file_path()?;
            names.contains(path).then(|| file.clone())
        })
    }

    /// Copies the root and every ancestor path leading to a file that
    /// `keep` maps to a replacement node.
    fn filter_files(&self, keep: &dyn Fn(&Node) -> Option<Node>) -> Node {
        self.filter_node(keep).unwrap_or_else(|| self.copy_empty())
    }

    fn filter_node(&self, keep: &dyn Fn(&Node) -> Option<Node>) -> Option<Node> {
        if self.kind == NodeKind::File {
            return keep(self);
        }
        let children: Vec<Node> = self
            .children
            .iter()
            .filter_map(|child| child.filter_node(keep))
            .collect();
        if children.is_empty() {
            return None;
        }
        let mut copy = self.copy_empty();
        copy.children = children;
        Some(copy)
    }
}

/// A copy of `file` whose line metrics are computed from `lines` only. Classes
/// and methods are kept when their line range intersects the selection; their
/// line metrics are dropped since the file carries them.
fn restrict_to_lines(file: &Node, lines: &BTreeSet<u32>) -> Node {
    let mut copy = file.copy_empty();
    if let Some(data) = file.file_data() {
        copy.file = Some(FileData {
            relative_path: data.relative_path.clone(),
            lines: data
                .lines
                .iter()
                .filter(|(line, _)| lines.contains(line))
                .map(|(line, counters)| (*line, *counters))
                .collect(),
            modified_lines: data.modified_lines.intersection(lines).copied().collect(),
            indirect_changes: data
                .indirect_changes
                .iter()
                .filter(|(line, _)| lines.contains(line))
                .map(|(line, delta)| (*line, *delta))
                .collect(),
            coverage_deltas: data.coverage_deltas.clone(),
        });
        for value in data.line_values(lines) {
            copy.add_value(value);
        }
    }
    copy.children = file
        .children
        .iter()
        .filter_map(|child| restrict_member(child, lines))
        .collect();
    copy
}

fn restrict_member(node: &Node, lines: &BTreeSet<u32>) -> Option<Node> {
    let children: Vec<Node> = node
        .children
        .iter()
        .filter_map(|child| restrict_member(child, lines))
        .collect();
    let touched = node.line_range.is_some_and(|range| range.intersects(lines));
    if !touched && children.is_empty() {
        return None;
    }
    let mut copy = node.copy_empty();
    copy.values = node
        .values
        .iter()
        .filter(|value| !LINE_METRICS.contains(&value.metric()))
        .copied()
        .collect();
    copy.children = children;
    Some(copy)
}
