//! Merging of metric trees produced by separate parser runs.
//!
//! Nodes are matched by kind and name along their path. Two reports of the
//! same code combine like two test runs: line counters and coverage values
//! keep the better covered copy. Two reports that claim the same node but
//! disagree on its size describe different code and raise a
//! [`CovmetricsError::MergeConflict`], unless errors are ignored.

use crate::error::{CovmetricsError, Result};
use crate::log::FilteredLog;
use crate::metric::NodeKind;
use crate::node::{FileData, LineCounters, Node};
use crate::value::Value;

/// Name of the synthetic root holding trees with different roots.
pub const CONTAINER_NAME: &str = "Container";

/// How structural merge conflicts are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Abort with the conflict.
    #[default]
    FailFast,
    /// Keep the first copy of a conflicting node and log the conflict.
    IgnoreErrors,
}

impl ProcessingMode {
    pub fn from_ignore_errors(ignore_errors: bool) -> Self {
        if ignore_errors {
            ProcessingMode::IgnoreErrors
        } else {
            ProcessingMode::FailFast
        }
    }
}

impl Node {
    /// Merges all `trees` into a single tree. An empty list yields the empty
    /// sentinel; roots with different identities end up below a container.
    pub fn merge(trees: Vec<Node>, mode: ProcessingMode, log: &mut FilteredLog) -> Result<Node> {
        let mut trees = trees.into_iter();
        let Some(first) = trees.next() else {
            return Ok(Node::empty());
        };
        let rest: Vec<Node> = trees.collect();
        if rest.iter().all(|tree| tree.same_identity(&first)) {
            let mut merged = first;
            for tree in rest {
                merged.merge_root(tree, mode, log)?;
            }
            return Ok(merged);
        }

        let mut container = Node::container(CONTAINER_NAME);
        for tree in std::iter::once(first).chain(rest) {
            let parts = if tree.kind == NodeKind::Container {
                tree.children
            } else {
                vec![tree]
            };
            for part in parts {
                container.merge_child(part, mode, log)?;
            }
        }
        Ok(container)
    }

    /// Merges `other` into this node. Both must have the same identity.
    pub fn merge_with(&mut self, other: Node, mode: ProcessingMode, log: &mut FilteredLog) -> Result<()> {
        if !self.same_identity(&other) {
            return Err(CovmetricsError::MergeConflict {
                path: self.name.clone(),
                message: format!("cannot merge {} '{}' with {} '{}'", self.kind, self.name, other.kind, other.name),
            });
        }
        let Node {
            values,
            children,
            file,
            line_range,
            ..
        } = other;

        for value in values {
            let merged = match self.own_value(value.metric()) {
                Some(existing) => merge_values(&self.name, &existing, &value)?,
                None => value,
            };
            self.add_value(merged);
        }
        if let (Some(target), Some(source)) = (self.file.as_mut(), file) {
            merge_file_data(&self.name, target, source)?;
        }
        if self.line_range.is_none() {
            self.line_range = line_range;
        }
        for child in children {
            self.merge_child(child, mode, log)?;
        }
        Ok(())
    }

    /// Merges another report's root. In lenient mode a conflicting report is
    /// skipped as a whole and the root stays as it was.
    fn merge_root(&mut self, other: Node, mode: ProcessingMode, log: &mut FilteredLog) -> Result<()> {
        if mode == ProcessingMode::FailFast {
            return self.merge_with(other, mode, log);
        }
        let mut merged = self.clone();
        match merged.merge_with(other, mode, log) {
            Ok(()) => {
                *self = merged;
                Ok(())
            }
            Err(error @ CovmetricsError::MergeConflict { .. }) => {
                log.log_error(format!("Skipping report of {} '{}': {error}", self.kind, self.name));
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Adds `child`, merging it into an existing child of the same identity.
    /// The existing child is only replaced once its merge succeeded.
    fn merge_child(&mut self, child: Node, mode: ProcessingMode, log: &mut FilteredLog) -> Result<()> {
        let Some(position) = self.children.iter().position(|c| c.same_identity(&child)) else {
            return self.add_child(child);
        };
        let mut merged = self.children[position].clone();
        let description = format!("{} '{}'", child.kind, child.name);
        match merged.merge_with(child, mode, log) {
            Ok(()) => {
                self.children[position] = merged;
                Ok(())
            }
            Err(error @ CovmetricsError::MergeConflict { .. }) if mode == ProcessingMode::IgnoreErrors => {
                log.log_error(format!("Skipping duplicate {description} in '{}': {error}", self.name));
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

fn merge_values(path: &str, existing: &Value, other: &Value) -> Result<Value> {
    match (existing, other) {
        (Value::Coverage(a), Value::Coverage(b)) if a.total() != b.total() => {
            Err(CovmetricsError::MergeConflict {
                path: path.to_string(),
                message: format!(
                    "{} has {} elements in one report and {} in another",
                    a.metric,
                    a.total(),
                    b.total()
                ),
            })
        }
        (Value::Coverage(_), Value::Coverage(_)) => existing.checked_max(other),
        (Value::Scalar(a), Value::Scalar(b)) if a.value != b.value => Err(CovmetricsError::MergeConflict {
            path: path.to_string(),
            message: format!("{} is {} in one report and {} in another", a.metric, existing, other),
        }),
        _ => Ok(*existing),
    }
}

fn merge_file_data(path: &str, target: &mut FileData, source: FileData) -> Result<()> {
    for (line, counters) in source.lines {
        let merged = match target.lines.get(&line) {
            Some(existing) => merge_line(path, line, existing, &counters)?,
            None => counters,
        };
        target.lines.insert(line, merged);
    }
    target.modified_lines.extend(source.modified_lines);
    target.indirect_changes.extend(source.indirect_changes);
    if target.relative_path.is_empty() {
        target.relative_path = source.relative_path;
    }
    Ok(())
}

fn merge_line(path: &str, line: u32, a: &LineCounters, b: &LineCounters) -> Result<LineCounters> {
    if a.total() != b.total() || a.branch_total() != b.branch_total() {
        return Err(CovmetricsError::MergeConflict {
            path: path.to_string(),
            message: format!("line {line} has different counters in the reports"),
        });
    }
    let covered = a.covered.max(b.covered);
    let branch_covered = a.branch_covered.max(b.branch_covered);
    Ok(LineCounters {
        covered,
        missed: a.total() - covered,
        branch_covered,
        branch_missed: a.branch_total() - branch_covered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;

    fn method(name: &str, covered: u64, missed: u64) -> Node {
        let mut method = Node::method(name);
        method.add_value(Value::coverage(Metric::Line, covered, missed));
        method
    }

    fn tree(methods: Vec<Node>) -> Node {
        let mut class = Node::class("Sample");
        class.add_children(methods).unwrap();
        let mut file = Node::file("Sample.cs", "src/Sample.cs");
        file.add_child(class).unwrap();
        let mut root = Node::module("app");
        root.add_child(file).unwrap();
        root
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = Node::merge(vec![], ProcessingMode::FailFast, &mut FilteredLog::default()).unwrap();
        assert_eq!(merged, Node::empty());
    }

    #[test]
    fn test_merge_unions_children_and_keeps_better_coverage() {
        let left = tree(vec![method("Run()", 1, 3)]);
        let right = tree(vec![method("Run()", 3, 1), method("Stop()", 2, 0)]);
        let merged = Node::merge(vec![left, right], ProcessingMode::FailFast, &mut FilteredLog::default()).unwrap();

        let class = merged.find(NodeKind::Class, "Sample").unwrap();
        assert_eq!(class.children().len(), 2);
        assert_eq!(merged.get_value(Metric::Line).unwrap(), Some(Value::coverage(Metric::Line, 5, 1)));
    }

    #[test]
    fn test_merge_lines() {
        let mut left = Node::file("a.rs", "src/a.rs");
        left.add_line(1, LineCounters::new(0, 2));
        left.add_line(2, LineCounters::new(1, 0));
        let mut right = Node::file("a.rs", "src/a.rs");
        right.add_line(1, LineCounters::new(1, 1));
        right.add_line(3, LineCounters::new(0, 1));

        left.merge_with(right, ProcessingMode::FailFast, &mut FilteredLog::default()).unwrap();
        let lines = &left.file_data().unwrap().lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[&1], LineCounters::new(1, 1));
    }

    #[test]
    fn test_conflict_is_fatal_in_strict_mode() {
        let left = tree(vec![method("Enumerate()", 1, 3)]);
        let right = tree(vec![method("Enumerate()", 2, 7)]);
        let err = Node::merge(vec![left, right], ProcessingMode::FailFast, &mut FilteredLog::default()).unwrap_err();
        assert!(matches!(err, CovmetricsError::MergeConflict { .. }));
    }

    #[test]
    fn test_conflict_is_logged_in_lenient_mode() {
        let left = tree(vec![method("Enumerate()", 1, 3)]);
        let right = tree(vec![method("Enumerate()", 2, 7)]);
        let mut log = FilteredLog::default();
        let merged = Node::merge(vec![left, right], ProcessingMode::IgnoreErrors, &mut log).unwrap();

        assert_eq!(merged.get_value(Metric::Line).unwrap(), Some(Value::coverage(Metric::Line, 1, 3)));
        assert_eq!(log.error_messages().len(), 1);
        assert!(log.error_messages()[0].contains("Enumerate()"));
    }

    #[test]
    fn test_root_conflict_is_logged_in_lenient_mode() {
        let mut first = Node::module("app");
        first.add_value(Value::coverage(Metric::Line, 1, 1));
        let mut second = Node::module("app");
        second.add_value(Value::coverage(Metric::Line, 1, 5));
        let third = tree(vec![method("Run()", 2, 0)]);

        let err = Node::merge(
            vec![first.clone(), second.clone()],
            ProcessingMode::FailFast,
            &mut FilteredLog::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CovmetricsError::MergeConflict { .. }));

        let mut log = FilteredLog::default();
        let merged = Node::merge(vec![first, second, third], ProcessingMode::IgnoreErrors, &mut log).unwrap();
        assert_eq!(merged.own_value(Metric::Line), Some(Value::coverage(Metric::Line, 1, 1)));
        assert!(merged.find(NodeKind::Method, "Run()").is_some());
        assert_eq!(log.error_messages().len(), 1);
        assert!(log.error_messages()[0].starts_with("Skipping report of module 'app'"));
    }

    #[test]
    fn test_different_roots_go_into_container() {
        let merged = Node::merge(
            vec![Node::module("a"), Node::module("b")],
            ProcessingMode::FailFast,
            &mut FilteredLog::default(),
        )
        .unwrap();
        assert_eq!(merged.kind(), NodeKind::Container);
        assert_eq!(merged.name(), CONTAINER_NAME);
        assert_eq!(merged.children().len(), 2);
    }
}
