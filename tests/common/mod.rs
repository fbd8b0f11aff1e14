#![allow(dead_code)]

use covmetrics::metric::Metric;
use covmetrics::node::{LineCounters, LineRange, Node};
use covmetrics::value::Value;

/// A file node with line counters for `covered` and `missed` lines and the
/// matching LINE value.
pub fn file(path: &str, covered: &[u32], missed: &[u32]) -> Node {
    let name = path.rsplit('/').next().unwrap();
    let mut file = Node::file(name, path);
    for &line in covered {
        file.add_line(line, LineCounters::new(1, 0));
    }
    for &line in missed {
        file.add_line(line, LineCounters::new(0, 1));
    }
    file.add_value(Value::coverage(
        Metric::Line,
        covered.len() as u64,
        missed.len() as u64,
    ));
    file
}

/// A module named `name` holding `files` in a single package.
pub fn project(name: &str, files: Vec<Node>) -> Node {
    let mut package = Node::package("src");
    package.add_children(files).unwrap();
    let mut root = Node::module(name);
    root.add_child(package).unwrap();
    root
}

/// A method spanning `lines` with the given LINE counters.
pub fn method(name: &str, lines: (u32, u32), covered: u64, missed: u64) -> Node {
    let mut method = Node::method(name);
    method.set_line_range(LineRange::new(lines.0, lines.1));
    method.add_value(Value::coverage(Metric::Line, covered, missed));
    method
}

/// A root carrying its values directly.
pub fn root_with_values(values: &[Value]) -> Node {
    let mut root = Node::module("root");
    for value in values {
        root.add_value(*value);
    }
    root
}
