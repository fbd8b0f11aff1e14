//! Text and markdown summaries of the statistics and quality gates of a build.

use std::fmt::Write;

use crate::format::{format_details, format_value};
use crate::gate::QualityGateResult;
use crate::node::Node;
use crate::statistics::{Baseline, CoverageStatistics};

/// Everything a summary shows, ready to be formatted.
pub struct SummaryReport<'a> {
    pub statistics: &'a CoverageStatistics,
    /// Gate outcome, absent when no gates were evaluated.
    pub quality_gates: Option<&'a QualityGateResult>,
    /// Annotated tree used to list uncovered modified lines.
    pub root: Option<&'a Node>,
}

impl SummaryReport<'_> {
    /// Format using a specific formatter.
    #[must_use]
    pub fn format(&self, formatter: &dyn ReportFormatter) -> String {
        formatter.format(self)
    }

    /// Baselines with at least one value, in display order.
    fn baselines(&self) -> Vec<Baseline> {
        Baseline::ALL
            .into_iter()
            .filter(|baseline| !self.statistics.values(*baseline).is_empty())
            .collect()
    }

    /// Files with modified lines that are not covered, with those lines and
    /// all lines carrying coverage data.
    fn missed_modified_lines(&self) -> Vec<MissedLines> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        root.all_file_nodes()
            .into_iter()
            .filter_map(|file| {
                let data = file.file_data()?;
                let missed: Vec<u32> = data
                    .modified_lines
                    .iter()
                    .filter(|line| data.lines.get(line).is_some_and(|c| !c.is_covered()))
                    .copied()
                    .collect();
                (!missed.is_empty()).then(|| MissedLines {
                    path: file.file_path().unwrap_or(file.name()).to_string(),
                    missed,
                    instrumented: data.lines.keys().copied().collect(),
                })
            })
            .collect()
    }
}

struct MissedLines {
    path: String,
    missed: Vec<u32>,
    instrumented: Vec<u32>,
}

/// Trait for formatting summaries.
pub trait ReportFormatter {
    /// Format the report to a string.
    fn format(&self, report: &SummaryReport) -> String;
}

/// Plain text formatter.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &SummaryReport) -> String {
        let mut out = String::new();

        let baselines = report.baselines();
        if baselines.is_empty() {
            out.push_str("No coverage values found.\n");
        }
        for baseline in baselines {
            let _ = writeln!(out, "{}:", baseline.title());
            for value in report.statistics.values(baseline) {
                let _ = writeln!(out, "  {}: {}", value.metric().display_name(), format_details(&value));
            }
        }

        let missed = report.missed_modified_lines();
        if !missed.is_empty() {
            out.push_str("\nUncovered modified lines:\n");
            for file in &missed {
                let ranges = format_line_ranges(&file.missed, &file.instrumented);
                let _ = writeln!(out, "  {}  {ranges}", file.path);
            }
        }

        if let Some(result) = report.quality_gates {
            let _ = writeln!(out, "\nQuality gates: {}", result.overall_status());
            for message in result.messages() {
                let _ = writeln!(out, "  {message}");
            }
        }

        out
    }
}

/// Markdown formatter.
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &SummaryReport) -> String {
        let mut md = String::new();

        md.push_str("### Coverage Summary\n");
        let baselines = report.baselines();
        if baselines.is_empty() {
            md.push_str("\nNo coverage values found.\n");
        }
        for baseline in baselines {
            let _ = writeln!(md, "\n#### {}\n", baseline.title());
            md.push_str("| Metric | Value |\n");
            md.push_str("|:-------|------:|\n");
            for value in report.statistics.values(baseline) {
                let _ = writeln!(md, "| {} | {} |", value.metric().display_name(), format_value(&value));
            }
        }

        let missed = report.missed_modified_lines();
        if !missed.is_empty() {
            md.push_str("\n<details>\n<summary>Uncovered modified lines</summary>\n\n");
            for file in &missed {
                let ranges = format_line_ranges(&file.missed, &file.instrumented);
                let _ = writeln!(md, "**`{}`**: {ranges}\n", file.path);
            }
            md.push_str("</details>\n");
        }

        if let Some(result) = report.quality_gates {
            let _ = writeln!(md, "\n#### Quality Gates: {}\n", result.overall_status());
            if result.items().is_empty() {
                md.push_str("No quality gates have been set.\n");
            }
            for message in result.messages() {
                let _ = writeln!(md, "- {message}");
            }
        }

        md
    }
}

/// Maximum number of consecutive non-instrumented lines that can be bridged
/// when coalescing uncovered ranges.
const MAX_BRIDGE_GAP: u32 = 2;

/// Coalesce sorted line numbers into `(start, end)` ranges, bridging small
/// gaps where every line in the gap carries no coverage data.
///
/// A gap between two uncovered lines is bridged only when:
/// 1. Every line in the gap is absent from `instrumented`, AND
/// 2. The gap is at most [`MAX_BRIDGE_GAP`] lines wide.
///
/// Both `lines` and `instrumented` must be sorted and deduplicated.
#[must_use]
pub fn coalesce_ranges(lines: &[u32], instrumented: &[u32]) -> Vec<(u32, u32)> {
    let Some((&first, rest)) = lines.split_first() else {
        return Vec::new();
    };

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    let mut start = first;
    let mut end = first;

    for &line in rest {
        let gap = line - end - 1;
        if gap <= MAX_BRIDGE_GAP && (end + 1..line).all(|l| instrumented.binary_search(&l).is_err()) {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }

    ranges.push((start, end));
    ranges
}

/// Format line numbers into compact range notation, e.g. "1, 3-5, 8".
#[must_use]
pub fn format_line_ranges(lines: &[u32], instrumented: &[u32]) -> String {
    coalesce_ranges(lines, instrumented)
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{CoverageQualityGate, QualityGateCriticality, QualityGateStatus};
    use crate::metric::Metric;
    use crate::node::LineCounters;
    use crate::value::{Difference, Value};

    fn statistics() -> CoverageStatistics {
        CoverageStatistics::builder()
            .project([Value::coverage(Metric::Line, 3, 1), Value::integer(Metric::Loc, 120)])
            .project_delta([Difference::from_integer(Metric::Line, -5)])
            .build()
    }

    fn gate_result() -> QualityGateResult {
        let mut result = QualityGateResult::new();
        result.add(
            CoverageQualityGate::new(80.0, Metric::Line, Baseline::Project, QualityGateCriticality::Failure),
            QualityGateStatus::Failed,
            "75.00%",
        );
        result
    }

    #[test]
    fn test_coalesce_ranges() {
        assert_eq!(coalesce_ranges(&[], &[]), Vec::<(u32, u32)>::new());
        assert_eq!(coalesce_ranges(&[1, 2, 3], &[1, 2, 3]), vec![(1, 3)]);
        // line 3 carries no coverage data → bridge
        assert_eq!(coalesce_ranges(&[1, 2, 4, 5], &[1, 2, 4, 5]), vec![(1, 5)]);
        // gap of three → too wide
        assert_eq!(coalesce_ranges(&[1, 2, 6, 7], &[1, 2, 6, 7]), vec![(1, 2), (6, 7)]);
        // line 3 is instrumented (covered) → no bridge
        assert_eq!(coalesce_ranges(&[1, 2, 4, 5], &[1, 2, 3, 4, 5]), vec![(1, 2), (4, 5)]);
    }

    #[test]
    fn test_format_line_ranges() {
        assert_eq!(format_line_ranges(&[], &[]), "");
        assert_eq!(format_line_ranges(&[5], &[5]), "5");
        assert_eq!(
            format_line_ranges(&[1, 3, 4, 5, 10], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            "1, 3-5, 10"
        );
    }

    #[test]
    fn test_text_summary() {
        let statistics = statistics();
        let result = gate_result();
        let report = SummaryReport {
            statistics: &statistics,
            quality_gates: Some(&result),
            root: None,
        };
        let text = report.format(&TextFormatter);
        assert!(text.contains("Overall project:\n  Line Coverage: 75.00% (3/4)"));
        assert!(text.contains("  Lines of Code: 120"));
        assert!(text.contains("Overall project (difference to reference job):\n  Line Coverage: -5.00%"));
        assert!(text.contains("Quality gates: Failed"));
        assert!(text.contains("[Overall project - Line Coverage]: ≪Failed≫"));
    }

    #[test]
    fn test_markdown_summary_with_missed_lines() {
        let mut file = Node::file("a.rs", "src/a.rs");
        for line in 1..=5 {
            file.add_line(line, LineCounters::new(u32::from(line == 3), u32::from(line != 3)));
        }
        file.file_data_mut().unwrap().modified_lines = [1, 2, 3, 4].into_iter().collect();
        let mut root = Node::module("root");
        root.add_child(file).unwrap();

        let statistics = statistics();
        let report = SummaryReport {
            statistics: &statistics,
            quality_gates: None,
            root: Some(&root),
        };
        let md = report.format(&MarkdownFormatter);
        assert!(md.contains("#### Overall project\n"));
        assert!(md.contains("| Line Coverage | 75.00% |"));
        assert!(md.contains("**`src/a.rs`**: 1-2, 4"));
        assert!(!md.contains("Quality Gates"));
    }

    #[test]
    fn test_empty_summary() {
        let statistics = CoverageStatistics::default();
        let result = QualityGateResult::new();
        let report = SummaryReport {
            statistics: &statistics,
            quality_gates: Some(&result),
            root: None,
        };
        assert!(report.format(&TextFormatter).contains("No coverage values found."));
        let md = report.format(&MarkdownFormatter);
        assert!(md.contains("Quality Gates: Not built"));
        assert!(md.contains("No quality gates have been set."));
    }
}
