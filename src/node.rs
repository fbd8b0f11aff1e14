//! Hierarchical metric tree: container → module → package → file → class →
//! method, with the values measured at each node.
//!
//! A single `Node` type carries an explicit [`NodeKind`]; everything that
//! differs per kind is looked up on the kind itself.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{CovmetricsError, Result};
use crate::metric::{Metric, NodeKind};
use crate::value::{Difference, Value};

/// Name of the sentinel node produced when there is nothing to report.
pub const EMPTY_NAME: &str = "Empty";

/// Per-line counters of a source file: instruction (or line) counters and
/// branch counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineCounters {
    #[serde(default)]
    pub covered: u32,
    #[serde(default)]
    pub missed: u32,
    #[serde(default)]
    pub branch_covered: u32,
    #[serde(default)]
    pub branch_missed: u32,
}

impl LineCounters {
    pub fn new(covered: u32, missed: u32) -> Self {
        Self {
            covered,
            missed,
            ..Default::default()
        }
    }

    pub fn with_branches(mut self, covered: u32, missed: u32) -> Self {
        self.branch_covered = covered;
        self.branch_missed = missed;
        self
    }

    pub fn is_covered(&self) -> bool {
        self.covered > 0
    }

    pub fn total(&self) -> u32 {
        self.covered + self.missed
    }

    pub fn branch_total(&self) -> u32 {
        self.branch_covered + self.branch_missed
    }
}

/// Inclusive line range of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn contains(&self, line: u32) -> bool {
        (self.start..=self.end).contains(&line)
    }

    pub fn intersects(&self, lines: &BTreeSet<u32>) -> bool {
        lines.range(self.start..=self.end).next().is_some()
    }
}

/// Line level data of a file node. Modified lines, indirect changes and
/// coverage deltas are annotations attached after the tree was built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    #[serde(default)]
    pub relative_path: String,
    #[serde(default)]
    pub lines: BTreeMap<u32, LineCounters>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub modified_lines: BTreeSet<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indirect_changes: BTreeMap<u32, i64>,
    #[serde(skip)]
    pub coverage_deltas: BTreeMap<Metric, Difference>,
}

impl FileData {
    /// Modified lines that carry coverage counters.
    pub fn modified_lines_with_coverage(&self) -> BTreeSet<u32> {
        self.modified_lines
            .iter()
            .filter(|line| self.lines.contains_key(line))
            .copied()
            .collect()
    }

    /// LINE and BRANCH coverage restricted to `selection`.
    pub fn line_values(&self, selection: &BTreeSet<u32>) -> Vec<Value> {
        let (mut covered, mut missed) = (0u64, 0u64);
        let (mut branch_covered, mut branch_missed) = (0u64, 0u64);
        for counters in selection.iter().filter_map(|line| self.lines.get(line)) {
            if counters.is_covered() {
                covered += 1;
            } else {
                missed += 1;
            }
            branch_covered += u64::from(counters.branch_covered);
            branch_missed += u64::from(counters.branch_missed);
        }
        let mut values = Vec::new();
        if covered + missed > 0 {
            values.push(Value::coverage(Metric::Line, covered, missed));
        }
        if branch_covered + branch_missed > 0 {
            values.push(Value::coverage(Metric::Branch, branch_covered, branch_missed));
        }
        values
    }
}

/// A scope of the metric tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) file: Option<FileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) line_range: Option<LineRange>,
}

/// Serialized form of a [`Node`]. Children are attached through
/// [`Node::add_child`] so parsed trees obey the same nesting rules as built
/// ones.
#[derive(Deserialize)]
struct RawNode {
    kind: NodeKind,
    name: String,
    #[serde(default)]
    values: Vec<Value>,
    #[serde(default)]
    children: Vec<Node>,
    #[serde(default)]
    file: Option<FileData>,
    #[serde(default)]
    line_range: Option<LineRange>,
}

impl TryFrom<RawNode> for Node {
    type Error = CovmetricsError;

    fn try_from(raw: RawNode) -> Result<Self> {
        let mut node = Node::new(raw.kind, raw.name);
        for value in raw.values {
            node.add_value(value);
        }
        node.add_children(raw.children)?;
        if node.kind == NodeKind::File {
            if let Some(file) = raw.file {
                node.file = Some(file);
            }
        }
        node.line_range = raw.line_range;
        Ok(node)
    }
}

impl Node {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        let file = (kind == NodeKind::File).then(FileData::default);
        Self {
            kind,
            name: name.into(),
            values: Vec::new(),
            children: Vec::new(),
            file,
            line_range: None,
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Container, name)
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Module, name)
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Package, name)
    }

    /// A file node; `relative_path` is the path used to match SCM changes.
    pub fn file(name: impl Into<String>, relative_path: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::File, name);
        if let Some(data) = node.file.as_mut() {
            data.relative_path = relative_path.into();
        }
        node
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Class, name)
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Method, name)
    }

    /// The sentinel returned when no results are available.
    pub fn empty() -> Self {
        Self::module(EMPTY_NAME)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Values attached directly to this node.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn line_range(&self) -> Option<LineRange> {
        self.line_range
    }

    pub fn set_line_range(&mut self, range: LineRange) {
        self.line_range = Some(range);
    }

    pub fn file_data(&self) -> Option<&FileData> {
        self.file.as_ref()
    }

    pub fn file_data_mut(&mut self) -> Option<&mut FileData> {
        self.file.as_mut()
    }

    /// Relative path of a file node, falling back to its name.
    pub fn file_path(&self) -> Option<&str> {
        if self.kind != NodeKind::File {
            return None;
        }
        match &self.file {
            Some(data) if !data.relative_path.is_empty() => Some(data.relative_path.as_str()),
            _ => Some(self.name.as_str()),
        }
    }

    /// A tree without children and values has nothing to report.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.values.is_empty()
    }

    /// Appends a child, rejecting kinds this node may not contain.
    pub fn add_child(&mut self, child: Node) -> Result<()> {
        if !self.kind.can_contain(child.kind) {
            return Err(CovmetricsError::IllegalChild {
                parent: self.kind,
                child: child.kind,
            });
        }
        self.children.push(child);
        Ok(())
    }

    pub fn add_children(&mut self, children: impl IntoIterator<Item = Node>) -> Result<()> {
        for child in children {
            self.add_child(child)?;
        }
        Ok(())
    }

    /// Attaches a value, replacing an existing value of the same metric.
    pub fn add_value(&mut self, value: Value) {
        match self.values.iter_mut().find(|v| v.metric() == value.metric()) {
            Some(existing) => *existing = value,
            None => {
                self.values.push(value);
                self.values.sort();
            }
        }
    }

    /// Records a line's counters on a file node; ignored for other kinds.
    pub fn add_line(&mut self, line: u32, counters: LineCounters) {
        if self.kind == NodeKind::File {
            self.file
                .get_or_insert_with(FileData::default)
                .lines
                .insert(line, counters);
        }
    }

    pub fn own_value(&self, metric: Metric) -> Option<Value> {
        Value::find(metric, &self.values)
    }

    /// The aggregated value of `metric` for this subtree. Fails when values
    /// in the subtree cannot be combined.
    pub fn get_value(&self, metric: Metric) -> Result<Option<Value>> {
        Ok(self.aggregate_map()?.remove(&metric))
    }

    /// One value per metric present anywhere in the subtree, ordered by metric.
    ///
    /// Children are combined by addition. A value attached to this node only
    /// counts for metrics none of its children report. Structural coverage
    /// (file, class, ...) is derived from line coverage when not given.
    pub fn aggregate_values(&self) -> Result<Vec<Value>> {
        Ok(self.aggregate_map()?.into_values().collect())
    }

    fn aggregate_map(&self) -> Result<BTreeMap<Metric, Value>> {
        let mut totals: BTreeMap<Metric, Value> = BTreeMap::new();
        for child in &self.children {
            for value in child.aggregate_map()?.into_values() {
                let combined = match totals.get(&value.metric()) {
                    Some(existing) => existing.add(&value)?,
                    None => value,
                };
                totals.insert(value.metric(), combined);
            }
        }
        for value in &self.values {
            totals.entry(value.metric()).or_insert(*value);
        }
        if self.kind != NodeKind::Container {
            let structural = self.kind.metric();
            if !totals.contains_key(&structural) {
                let line = totals
                    .get(&Metric::Line)
                    .and_then(Value::as_coverage)
                    .filter(|c| c.is_set())
                    .copied();
                if let Some(line) = line {
                    let covered = u64::from(line.covered > 0);
                    totals.insert(structural, Value::coverage(structural, covered, 1 - covered));
                }
            }
        }
        Ok(totals)
    }

    /// `self - reference` for every metric present in both trees. Metrics
    /// missing on either side produce no entry.
    pub fn compute_delta(&self, reference: &Node) -> Result<BTreeMap<Metric, Difference>> {
        let current = self.aggregate_map()?;
        let previous = reference.aggregate_map()?;
        let mut deltas = BTreeMap::new();
        for (metric, value) in &current {
            if let Some(reference_value) = previous.get(metric) {
                deltas.insert(*metric, value.delta(reference_value)?);
            }
        }
        Ok(deltas)
    }

    /// Stable hash of the node identity (kind and name).
    pub fn id_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.kind.hash(&mut hasher);
        self.name.hash(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn same_identity(&self, other: &Node) -> bool {
        self.kind == other.kind && self.name == other.name
    }

    /// Depth-first search for a node of the given kind and name.
    pub fn find(&self, kind: NodeKind, name: &str) -> Option<&Node> {
        if self.kind == kind && self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(kind, name))
    }

    pub fn find_mut(&mut self, kind: NodeKind, name: &str) -> Option<&mut Node> {
        if self.kind == kind && self.name == name {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(kind, name))
    }

    pub fn find_by_hash_code(&self, kind: NodeKind, hash: u64) -> Option<&Node> {
        if self.kind == kind && self.id_hash() == hash {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_hash_code(kind, hash))
    }

    pub fn find_package(&self, name: &str) -> Option<&Node> {
        self.find(NodeKind::Package, name)
    }

    pub fn find_package_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.find_mut(NodeKind::Package, name)
    }

    pub fn find_file(&self, path: &str) -> Option<&Node> {
        self.all_file_nodes()
            .into_iter()
            .find(|file| file.file_path() == Some(path))
    }

    pub fn find_file_mut(&mut self, path: &str) -> Option<&mut Node> {
        if self.file_path() == Some(path) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_file_mut(path))
    }

    pub fn all_file_nodes(&self) -> Vec<&Node> {
        let mut files = Vec::new();
        self.collect_kind(NodeKind::File, &mut files);
        files
    }

    pub fn all_class_nodes(&self) -> Vec<&Node> {
        let mut classes = Vec::new();
        self.collect_kind(NodeKind::Class, &mut classes);
        classes
    }

    fn collect_kind<'a>(&'a self, kind: NodeKind, found: &mut Vec<&'a Node>) {
        if self.kind == kind {
            found.push(self);
        }
        for child in &self.children {
            child.collect_kind(kind, found);
        }
    }

    pub(crate) fn for_each_file_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        if self.kind == NodeKind::File {
            f(self);
        }
        for child in &mut self.children {
            child.for_each_file_mut(f);
        }
    }

    /// Relative paths of all files in the tree.
    pub fn files(&self) -> BTreeSet<String> {
        self.all_file_nodes()
            .into_iter()
            .filter_map(Node::file_path)
            .map(str::to_string)
            .collect()
    }

    pub fn has_modified_lines(&self) -> bool {
        self.all_file_nodes().into_iter().any(|file| {
            file.file_data()
                .is_some_and(|data| !data.modified_lines.is_empty())
        })
    }

    /// A copy of this node without children and without own values.
    pub(crate) fn copy_empty(&self) -> Node {
        Node {
            kind: self.kind,
            name: self.name.clone(),
            values: Vec::new(),
            children: Vec::new(),
            file: self.file.as_ref().map(|data| FileData {
                relative_path: data.relative_path.clone(),
                ..Default::default()
            }),
            line_range: self.line_range,
        }
    }
}
