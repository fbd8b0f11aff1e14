//! Per-build snapshot of the values and deltas of every baseline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CovmetricsError;
use crate::metric::{normalize_name, Metric};
use crate::value::{Difference, Value};

/// The scope a value is reported for.
///
/// Indirect changes have no delta counterpart, so such a baseline cannot be
/// expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Baseline {
    Project,
    ModifiedLines,
    ModifiedFiles,
    ProjectDelta,
    ModifiedLinesDelta,
    ModifiedFilesDelta,
    Indirect,
}

impl Baseline {
    pub const ALL: [Baseline; 7] = [
        Baseline::Project,
        Baseline::ModifiedLines,
        Baseline::ModifiedFiles,
        Baseline::ProjectDelta,
        Baseline::ModifiedLinesDelta,
        Baseline::ModifiedFilesDelta,
        Baseline::Indirect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Baseline::Project => "project",
            Baseline::ModifiedLines => "modified_lines",
            Baseline::ModifiedFiles => "modified_files",
            Baseline::ProjectDelta => "project_delta",
            Baseline::ModifiedLinesDelta => "modified_lines_delta",
            Baseline::ModifiedFilesDelta => "modified_files_delta",
            Baseline::Indirect => "indirect",
        }
    }

    /// Title used in gate names and summaries.
    pub fn title(&self) -> &'static str {
        match self {
            Baseline::Project => "Overall project",
            Baseline::ModifiedLines => "Modified code lines",
            Baseline::ModifiedFiles => "Modified files",
            Baseline::ProjectDelta => "Overall project (difference to reference job)",
            Baseline::ModifiedLinesDelta => "Modified code lines (difference to modified files)",
            Baseline::ModifiedFilesDelta => "Modified files (difference to reference job)",
            Baseline::Indirect => "Indirect changes",
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(
            self,
            Baseline::ProjectDelta | Baseline::ModifiedLinesDelta | Baseline::ModifiedFilesDelta
        )
    }
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Baseline {
    type Err = CovmetricsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = normalize_name(s);
        Baseline::ALL
            .into_iter()
            .find(|b| b.as_str() == name)
            .ok_or_else(|| CovmetricsError::Parse(format!("No such baseline: '{s}'")))
    }
}

impl TryFrom<String> for Baseline {
    type Error = CovmetricsError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Baseline> for String {
    fn from(baseline: Baseline) -> Self {
        baseline.as_str().to_string()
    }
}

/// Values and deltas of one build, grouped by baseline. Built once with a
/// [`CoverageStatisticsBuilder`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageStatistics {
    project: Vec<Value>,
    modified_lines: Vec<Value>,
    modified_files: Vec<Value>,
    indirect: Vec<Value>,
    project_delta: Vec<Difference>,
    modified_lines_delta: Vec<Difference>,
    modified_files_delta: Vec<Difference>,
}

impl CoverageStatistics {
    pub fn builder() -> CoverageStatisticsBuilder {
        CoverageStatisticsBuilder::default()
    }

    /// Looks up the value of `metric` for `baseline`. Deltas are returned
    /// as [`Value::Difference`].
    pub fn get_value(&self, baseline: Baseline, metric: Metric) -> Option<Value> {
        match baseline {
            Baseline::Project => Value::find(metric, &self.project),
            Baseline::ModifiedLines => Value::find(metric, &self.modified_lines),
            Baseline::ModifiedFiles => Value::find(metric, &self.modified_files),
            Baseline::Indirect => Value::find(metric, &self.indirect),
            Baseline::ProjectDelta => find_difference(metric, &self.project_delta),
            Baseline::ModifiedLinesDelta => find_difference(metric, &self.modified_lines_delta),
            Baseline::ModifiedFilesDelta => find_difference(metric, &self.modified_files_delta),
        }
    }

    pub fn contains_value(&self, baseline: Baseline, metric: Metric) -> bool {
        self.get_value(baseline, metric).is_some()
    }

    /// The value rounded to two decimals, `0.0` when absent.
    pub fn round_value(&self, baseline: Baseline, metric: Metric) -> f64 {
        self.get_value(baseline, metric)
            .map(|value| value.as_rounded())
            .unwrap_or(0.0)
    }

    /// All values of a baseline, ordered by metric.
    pub fn values(&self, baseline: Baseline) -> Vec<Value> {
        match baseline {
            Baseline::Project => self.project.clone(),
            Baseline::ModifiedLines => self.modified_lines.clone(),
            Baseline::ModifiedFiles => self.modified_files.clone(),
            Baseline::Indirect => self.indirect.clone(),
            Baseline::ProjectDelta => self.project_delta.iter().map(|d| Value::from(*d)).collect(),
            Baseline::ModifiedLinesDelta => self.modified_lines_delta.iter().map(|d| Value::from(*d)).collect(),
            Baseline::ModifiedFilesDelta => self.modified_files_delta.iter().map(|d| Value::from(*d)).collect(),
        }
    }
}

fn find_difference(metric: Metric, differences: &[Difference]) -> Option<Value> {
    differences
        .iter()
        .find(|d| d.metric == metric)
        .map(|d| Value::from(*d))
}

/// Collects the lists of a [`CoverageStatistics`] snapshot.
#[derive(Debug, Default)]
pub struct CoverageStatisticsBuilder {
    statistics: CoverageStatistics,
}

impl CoverageStatisticsBuilder {
    pub fn project(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.statistics.project = sorted(values);
        self
    }

    pub fn modified_lines(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.statistics.modified_lines = sorted(values);
        self
    }

    pub fn modified_files(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.statistics.modified_files = sorted(values);
        self
    }

    pub fn indirect(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.statistics.indirect = sorted(values);
        self
    }

    pub fn project_delta(mut self, deltas: impl IntoIterator<Item = Difference>) -> Self {
        self.statistics.project_delta = sorted_deltas(deltas);
        self
    }

    pub fn modified_lines_delta(mut self, deltas: impl IntoIterator<Item = Difference>) -> Self {
        self.statistics.modified_lines_delta = sorted_deltas(deltas);
        self
    }

    pub fn modified_files_delta(mut self, deltas: impl IntoIterator<Item = Difference>) -> Self {
        self.statistics.modified_files_delta = sorted_deltas(deltas);
        self
    }

    pub fn build(self) -> CoverageStatistics {
        self.statistics
    }
}

fn sorted(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut values: Vec<Value> = values.into_iter().collect();
    values.sort();
    values
}

fn sorted_deltas(deltas: impl IntoIterator<Item = Difference>) -> Vec<Difference> {
    let mut deltas: Vec<Difference> = deltas.into_iter().collect();
    deltas.sort_by_key(|d| d.metric);
    deltas
}
