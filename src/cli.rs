//! Command handler functions for the covmetrics CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::changes::parse_diff;
use crate::config::RecorderConfig;
use crate::evaluator::{CoverageQualityGateEvaluator, ResultHandler};
use crate::gate::BuildResult;
use crate::log::FilteredLog;
use crate::node::Node;
use crate::report::{MarkdownFormatter, ReportFormatter, SummaryReport, TextFormatter};
use crate::reporter::{aggregate_results, CoverageReporter, ParsedReport};
use crate::statistics::CoverageStatistics;

/// Output style of the summaries.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Style {
    #[default]
    Text,
    Markdown,
}

impl Style {
    fn formatter(&self) -> &'static dyn ReportFormatter {
        match self {
            Style::Text => &TextFormatter,
            Style::Markdown => &MarkdownFormatter,
        }
    }
}

/// Reads a metric tree stored as JSON.
pub fn read_tree(path: &Path) -> Result<Node> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse metric tree {}", path.display()))
}

/// Inputs of the `evaluate` command.
#[derive(Debug, Default)]
pub struct EvaluateInput {
    pub coverage: Vec<Node>,
    pub tests: Vec<Node>,
    pub reference: Option<Node>,
    pub diff: Option<String>,
}

/// Rendered summary together with the build outcome.
#[derive(Debug)]
pub struct EvaluateOutput {
    pub text: String,
    pub build_result: BuildResult,
}

/// Keeps the outcome published by the evaluator.
struct BuildResultRecorder {
    result: BuildResult,
}

impl ResultHandler for BuildResultRecorder {
    fn publish_result(&mut self, result: BuildResult, _message: &str) {
        self.result = result;
    }
}

pub fn cmd_evaluate(input: EvaluateInput, config: &RecorderConfig, style: Style) -> Result<EvaluateOutput> {
    let mut log = FilteredLog::default();

    let reports = input
        .coverage
        .into_iter()
        .map(ParsedReport::coverage)
        .chain(input.tests.into_iter().map(ParsedReport::tests))
        .collect();
    let root = aggregate_results(reports, config.processing_mode(), &mut log).context("Failed to merge coverage trees")?;

    let delta = input.diff.as_deref().map(parse_diff);
    let report = CoverageReporter::new()
        .run(root, input.reference.as_ref(), delta.as_ref(), &mut log)
        .context("Failed to compute coverage statistics")?;

    let mut recorder = BuildResultRecorder {
        result: BuildResult::Success,
    };
    let result = CoverageQualityGateEvaluator::new(&config.quality_gates, &report.statistics)
        .with_root(&report.root)
        .evaluate(&mut recorder, &mut log);

    let summary = SummaryReport {
        statistics: &report.statistics,
        quality_gates: Some(&result),
        root: Some(&report.root),
    };
    let mut text = summary.format(style.formatter());
    append_errors(&mut text, &log);

    Ok(EvaluateOutput {
        text,
        build_result: recorder.result,
    })
}

pub fn cmd_summary(tree: &Node, style: Style) -> Result<String> {
    let values = tree.aggregate_values().context("Failed to aggregate metric tree")?;
    let statistics = CoverageStatistics::builder().project(values).build();
    let summary = SummaryReport {
        statistics: &statistics,
        quality_gates: None,
        root: None,
    };
    let mut out = String::new();
    let files = tree.all_file_nodes().len();
    writeln!(out, "{} '{}' ({files} files)", tree.kind(), tree.name())?;
    out.push_str(&summary.format(style.formatter()));
    Ok(out)
}

fn append_errors(out: &mut String, log: &FilteredLog) {
    if !log.has_errors() {
        return;
    }
    out.push('\n');
    out.push_str(log.title());
    out.push('\n');
    for message in log.error_messages() {
        out.push_str(&message);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;
    use crate::node::LineCounters;
    use crate::value::Value;

    fn tree(covered: &[u32], missed: &[u32]) -> Node {
        let mut file = Node::file("main.rs", "src/main.rs");
        for &line in covered {
            file.add_line(line, LineCounters::new(1, 0));
        }
        for &line in missed {
            file.add_line(line, LineCounters::new(0, 1));
        }
        file.add_value(Value::coverage(Metric::Line, covered.len() as u64, missed.len() as u64));
        let mut root = Node::module("app");
        root.add_child(file).unwrap();
        root
    }

    fn config(text: &str) -> RecorderConfig {
        RecorderConfig::from_toml(text).unwrap()
    }

    #[test]
    fn test_cmd_summary() {
        let out = cmd_summary(&tree(&[1, 2, 3], &[4]), Style::Text).unwrap();
        assert!(out.starts_with("module 'app' (1 files)"));
        assert!(out.contains("Line Coverage: 75.00% (3/4)"));
    }

    #[test]
    fn test_cmd_evaluate_without_reference() {
        let input = EvaluateInput {
            coverage: vec![tree(&[1, 2, 3], &[4])],
            ..Default::default()
        };
        let gates = config(
            r#"
[[quality_gates]]
metric = "line"
threshold = 80.0
criticality = "failure"
"#,
        );
        let out = cmd_evaluate(input, &gates, Style::Markdown).unwrap();
        assert_eq!(out.build_result, BuildResult::Failure);
        assert!(out.text.contains("#### Quality Gates: Failed"));
        assert!(out.text.contains("Actual value: 75.00%, Quality gate: 80.00"));
    }

    #[test]
    fn test_cmd_evaluate_with_diff() {
        let diff = "\
diff --git a/src/main.rs b/src/main.rs
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,2 +1,4 @@
 fn main() {
+    let x = 1;
+    let y = 2;
 }
";
        let input = EvaluateInput {
            coverage: vec![tree(&[1, 2, 4], &[3])],
            reference: Some(tree(&[1], &[2])),
            diff: Some(diff.to_string()),
            ..Default::default()
        };
        let gates = config(
            r#"
[[quality_gates]]
metric = "line"
baseline = "modified_lines"
threshold = 100.0
"#,
        );
        let out = cmd_evaluate(input, &gates, Style::Text).unwrap();
        assert_eq!(out.build_result, BuildResult::Unstable);
        assert!(out.text.contains("Modified code lines:\n"));
        assert!(out.text.contains("  Line Coverage: 50.00% (1/2)"));
        assert!(out.text.contains("Uncovered modified lines:\n  src/main.rs  3"));
    }

    #[test]
    fn test_cmd_evaluate_nothing_to_do() {
        let out = cmd_evaluate(EvaluateInput::default(), &RecorderConfig::default(), Style::Text).unwrap();
        assert_eq!(out.build_result, BuildResult::Success);
        assert!(out.text.contains("No coverage values found."));
        assert!(out.text.contains("No coverage results were found! Configuration error?"));
    }

    #[test]
    fn test_read_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, serde_json::to_string(&tree(&[1], &[2])).unwrap()).unwrap();
        let read = read_tree(&path).unwrap();
        assert_eq!(read.files().len(), 1);

        std::fs::write(&path, "{").unwrap();
        assert!(read_tree(&path).is_err());

        std::fs::write(&path, r#"{"kind": "file", "name": "a.rs", "children": [{"kind": "package", "name": "src"}]}"#)
            .unwrap();
        let err = read_tree(&path).unwrap_err();
        assert!(format!("{err:#}").contains("cannot contain"));
    }
}
