//! Quality gate configuration, statuses and the accumulated result of an
//! evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::aggregation::MetricAggregation;
use crate::error::CovmetricsError;
use crate::format::format_threshold;
use crate::metric::{normalize_name, Metric};
use crate::statistics::Baseline;

/// The severity a gate escalates to when its threshold is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QualityGateCriticality {
    Note,
    #[default]
    Unstable,
    Error,
    Failure,
}

impl QualityGateCriticality {
    pub const ALL: [QualityGateCriticality; 4] = [
        QualityGateCriticality::Note,
        QualityGateCriticality::Unstable,
        QualityGateCriticality::Error,
        QualityGateCriticality::Failure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGateCriticality::Note => "note",
            QualityGateCriticality::Unstable => "unstable",
            QualityGateCriticality::Error => "error",
            QualityGateCriticality::Failure => "failure",
        }
    }

    /// Status of a gate whose threshold is violated.
    pub fn status(&self) -> QualityGateStatus {
        match self {
            QualityGateCriticality::Note => QualityGateStatus::Note,
            QualityGateCriticality::Unstable => QualityGateStatus::Warning,
            QualityGateCriticality::Error => QualityGateStatus::Error,
            QualityGateCriticality::Failure => QualityGateStatus::Failed,
        }
    }
}

impl fmt::Display for QualityGateCriticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityGateCriticality {
    type Err = CovmetricsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = normalize_name(s);
        let name = match name.as_str() {
            "warning" => "unstable",
            "failed" | "fail" => "failure",
            other => other,
        };
        QualityGateCriticality::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| CovmetricsError::Parse(format!("Unknown criticality: '{s}'")))
    }
}

impl TryFrom<String> for QualityGateCriticality {
    type Error = CovmetricsError;

    fn try_from(value: String) -> std::result::Result<Self, CovmetricsError> {
        value.parse()
    }
}

impl From<QualityGateCriticality> for String {
    fn from(criticality: QualityGateCriticality) -> Self {
        criticality.as_str().to_string()
    }
}

/// Outcome of a gate, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum QualityGateStatus {
    /// No value was available.
    #[default]
    Inactive,
    Passed,
    Note,
    Warning,
    Error,
    Failed,
}

/// Outcome reported to the host build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
}

impl QualityGateStatus {
    pub fn description(&self) -> &'static str {
        match self {
            QualityGateStatus::Inactive => "Not built",
            QualityGateStatus::Passed => "Success",
            QualityGateStatus::Note => "Note",
            QualityGateStatus::Warning => "Unstable",
            QualityGateStatus::Error => "Error",
            QualityGateStatus::Failed => "Failed",
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(
            self,
            QualityGateStatus::Inactive | QualityGateStatus::Passed | QualityGateStatus::Note
        )
    }

    pub fn build_result(&self) -> BuildResult {
        match self {
            QualityGateStatus::Inactive | QualityGateStatus::Passed | QualityGateStatus::Note => {
                BuildResult::Success
            }
            QualityGateStatus::Warning => BuildResult::Unstable,
            QualityGateStatus::Error | QualityGateStatus::Failed => BuildResult::Failure,
        }
    }
}

impl fmt::Display for QualityGateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

fn default_baseline() -> Baseline {
    Baseline::Project
}

fn finite_threshold<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    let threshold = f64::deserialize(deserializer)?;
    if threshold.is_finite() {
        Ok(threshold)
    } else {
        Err(de::Error::custom(format!("threshold must be a finite number, got {threshold}")))
    }
}

/// A threshold on one (baseline, metric) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageQualityGate {
    pub metric: Metric,
    #[serde(default = "default_baseline")]
    pub baseline: Baseline,
    #[serde(default, deserialize_with = "finite_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub criticality: QualityGateCriticality,
    #[serde(default)]
    pub aggregation: MetricAggregation,
}

impl CoverageQualityGate {
    pub fn new(threshold: f64, metric: Metric, baseline: Baseline, criticality: QualityGateCriticality) -> Self {
        Self {
            metric,
            baseline,
            threshold,
            criticality,
            aggregation: MetricAggregation::Total,
        }
    }

    pub fn with_aggregation(mut self, aggregation: MetricAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Name shown in messages, e.g. "Overall project - Line Coverage".
    pub fn name(&self) -> String {
        let name = format!("{} - {}", self.baseline.title(), self.metric.display_name());
        if MetricAggregation::is_supported(self.metric) && self.aggregation != MetricAggregation::Total {
            format!("{name} ({})", self.aggregation)
        } else {
            name
        }
    }
}

/// Evaluation outcome of a single gate.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityGateResultItem {
    pub gate: CoverageQualityGate,
    pub status: QualityGateStatus,
    pub actual_value: String,
}

impl QualityGateResultItem {
    pub fn message(&self) -> String {
        format!(
            "[{}]: ≪{}≫ - (Actual value: {}, Quality gate: {})",
            self.gate.name(),
            self.status,
            self.actual_value,
            format_threshold(self.gate.threshold)
        )
    }
}

/// Results of all evaluated gates in configuration order, plus the most
/// severe status seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityGateResult {
    items: Vec<QualityGateResultItem>,
    overall_status: QualityGateStatus,
}

impl QualityGateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, gate: CoverageQualityGate, status: QualityGateStatus, actual_value: impl Into<String>) {
        self.overall_status = self.overall_status.max(status);
        self.items.push(QualityGateResultItem {
            gate,
            status,
            actual_value: actual_value.into(),
        });
    }

    pub fn items(&self) -> &[QualityGateResultItem] {
        &self.items
    }

    pub fn messages(&self) -> Vec<String> {
        self.items.iter().map(QualityGateResultItem::message).collect()
    }

    pub fn overall_status(&self) -> QualityGateStatus {
        self.overall_status
    }

    pub fn is_successful(&self) -> bool {
        self.overall_status.is_successful()
    }

    pub fn is_inactive(&self) -> bool {
        self.overall_status == QualityGateStatus::Inactive
    }
}
