//! Metric and node-kind vocabulary shared by the tree, the values and the
//! quality gates.
//!
//! All kind-specific behavior (legal children, the structural metric of a
//! node, how leaf values are collected) lives in lookup tables here instead of
//! being spread over per-kind types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CovmetricsError;

/// Normalize a user supplied name: case-insensitive, `-` and spaces act like `_`.
pub(crate) fn normalize_name(s: &str) -> String {
    s.trim().to_lowercase().replace(['-', ' '], "_")
}

/// Whether larger or smaller values of a metric are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tendency {
    LargerIsBetter,
    SmallerIsBetter,
}

/// A measurable property. The declaration order is the fixed sort order of
/// values and deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    Container,
    Module,
    Package,
    File,
    Class,
    Method,
    Line,
    Branch,
    Instruction,
    McdcPair,
    FunctionCall,
    Mutation,
    TestStrength,
    Tests,
    CyclomaticComplexity,
    CognitiveComplexity,
    NpathComplexity,
    Loc,
    Ncss,
}

impl Metric {
    pub const ALL: [Metric; 19] = [
        Metric::Container,
        Metric::Module,
        Metric::Package,
        Metric::File,
        Metric::Class,
        Metric::Method,
        Metric::Line,
        Metric::Branch,
        Metric::Instruction,
        Metric::McdcPair,
        Metric::FunctionCall,
        Metric::Mutation,
        Metric::TestStrength,
        Metric::Tests,
        Metric::CyclomaticComplexity,
        Metric::CognitiveComplexity,
        Metric::NpathComplexity,
        Metric::Loc,
        Metric::Ncss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Container => "container",
            Metric::Module => "module",
            Metric::Package => "package",
            Metric::File => "file",
            Metric::Class => "class",
            Metric::Method => "method",
            Metric::Line => "line",
            Metric::Branch => "branch",
            Metric::Instruction => "instruction",
            Metric::McdcPair => "mcdc_pair",
            Metric::FunctionCall => "function_call",
            Metric::Mutation => "mutation",
            Metric::TestStrength => "test_strength",
            Metric::Tests => "tests",
            Metric::CyclomaticComplexity => "cyclomatic_complexity",
            Metric::CognitiveComplexity => "cognitive_complexity",
            Metric::NpathComplexity => "npath_complexity",
            Metric::Loc => "loc",
            Metric::Ncss => "ncss",
        }
    }

    /// Human readable name used in gate names and summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Container => "Container Coverage",
            Metric::Module => "Module Coverage",
            Metric::Package => "Package Coverage",
            Metric::File => "File Coverage",
            Metric::Class => "Class Coverage",
            Metric::Method => "Method Coverage",
            Metric::Line => "Line Coverage",
            Metric::Branch => "Branch Coverage",
            Metric::Instruction => "Instruction Coverage",
            Metric::McdcPair => "Modified Condition and Decision Coverage",
            Metric::FunctionCall => "Function Call Coverage",
            Metric::Mutation => "Mutation Coverage",
            Metric::TestStrength => "Test Strength",
            Metric::Tests => "Number of Tests",
            Metric::CyclomaticComplexity => "Cyclomatic Complexity",
            Metric::CognitiveComplexity => "Cognitive Complexity",
            Metric::NpathComplexity => "N-Path Complexity",
            Metric::Loc => "Lines of Code",
            Metric::Ncss => "Non-Commenting Source Statements",
        }
    }

    /// Coverage metrics are measured as covered/missed counters.
    pub fn is_coverage(&self) -> bool {
        *self <= Metric::TestStrength
    }

    pub fn tendency(&self) -> Tendency {
        if self.is_coverage() || *self == Metric::Tests {
            Tendency::LargerIsBetter
        } else {
            Tendency::SmallerIsBetter
        }
    }

    /// Metrics describing the tree structure itself (module, file, class...).
    pub fn is_structural(&self) -> bool {
        *self <= Metric::Method
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CovmetricsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = normalize_name(s);
        let name = match name.as_str() {
            "lines_of_code" => "loc",
            "complexity" => "cyclomatic_complexity",
            "mcdc" => "mcdc_pair",
            other => other,
        };
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| CovmetricsError::Parse(format!("Unknown metric: '{s}'")))
    }
}

impl TryFrom<String> for Metric {
    type Error = CovmetricsError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.as_str().to_string()
    }
}

/// The scope a tree node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Container,
    Module,
    Package,
    File,
    Class,
    Method,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Container => "container",
            NodeKind::Module => "module",
            NodeKind::Package => "package",
            NodeKind::File => "file",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
        }
    }

    /// The structural coverage metric counting nodes of this kind.
    pub fn metric(&self) -> Metric {
        match self {
            NodeKind::Container => Metric::Container,
            NodeKind::Module => Metric::Module,
            NodeKind::Package => Metric::Package,
            NodeKind::File => Metric::File,
            NodeKind::Class => Metric::Class,
            NodeKind::Method => Metric::Method,
        }
    }

    pub fn legal_children(&self) -> &'static [NodeKind] {
        match self {
            NodeKind::Container => &[
                NodeKind::Module,
                NodeKind::Package,
                NodeKind::File,
                NodeKind::Class,
            ],
            NodeKind::Module => &[NodeKind::Package, NodeKind::File, NodeKind::Class],
            NodeKind::Package => &[NodeKind::Package, NodeKind::File, NodeKind::Class],
            NodeKind::File => &[NodeKind::Class, NodeKind::Method],
            NodeKind::Class => &[NodeKind::Class, NodeKind::Method],
            NodeKind::Method => &[],
        }
    }

    pub fn can_contain(&self, child: NodeKind) -> bool {
        self.legal_children().contains(&child)
    }

    /// Nodes of these kinds contribute their own value *and* every value
    /// beneath them when leaf values are collected for aggregation.
    pub fn collects_all_values(&self) -> bool {
        matches!(self, NodeKind::Class | NodeKind::Method)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
