//! Evaluation of quality gates against the statistics of a build.

use tracing::debug;

use crate::aggregation::{aggregate, MetricAggregation};
use crate::format::format_value;
use crate::gate::{BuildResult, CoverageQualityGate, QualityGateResult, QualityGateStatus};
use crate::log::FilteredLog;
use crate::node::Node;
use crate::statistics::{Baseline, CoverageStatistics};
use crate::value::Value;

/// Actual value reported for gates without data.
pub const NOT_AVAILABLE: &str = "n/a";

/// Receives the build outcome when quality gates are missed.
pub trait ResultHandler {
    fn publish_result(&mut self, result: BuildResult, message: &str);
}

/// Discards published results.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResultHandler;

impl ResultHandler for NullResultHandler {
    fn publish_result(&mut self, _result: BuildResult, _message: &str) {}
}

/// Evaluates gates in configuration order against one build.
pub struct CoverageQualityGateEvaluator<'a> {
    gates: &'a [CoverageQualityGate],
    statistics: &'a CoverageStatistics,
    root: Option<&'a Node>,
}

impl<'a> CoverageQualityGateEvaluator<'a> {
    pub fn new(gates: &'a [CoverageQualityGate], statistics: &'a CoverageStatistics) -> Self {
        Self {
            gates,
            statistics,
            root: None,
        }
    }

    /// Tree used for custom aggregation of project values.
    pub fn with_root(mut self, root: &'a Node) -> Self {
        self.root = Some(root);
        self
    }

    pub fn evaluate(&self, handler: &mut dyn ResultHandler, log: &mut FilteredLog) -> QualityGateResult {
        let mut result = QualityGateResult::new();
        if self.gates.is_empty() {
            log.log_info("No quality gates have been set - skipping");
            return result;
        }

        log.log_info("Evaluating quality gates");
        for gate in self.gates {
            let (status, actual) = match self.resolve(gate, log) {
                Some(value) if value.is_out_of_valid_range(gate.threshold) => {
                    (gate.criticality.status(), format_value(&value))
                }
                Some(value) => (QualityGateStatus::Passed, format_value(&value)),
                None => (QualityGateStatus::Inactive, NOT_AVAILABLE.to_string()),
            };
            log.log_info(format!("-> {} - {}: {}", status, gate.name(), actual));
            result.add(*gate, status, actual);
        }

        let overall = result.overall_status();
        if result.is_successful() {
            log.log_info("-> All quality gates have been passed");
        } else {
            let message = format!("Some quality gates have been missed: overall result is {overall}");
            log.log_info(format!("-> {message}"));
            handler.publish_result(overall.build_result(), &message);
        }
        result
    }

    fn resolve(&self, gate: &CoverageQualityGate, log: &mut FilteredLog) -> Option<Value> {
        match self.root {
            Some(root)
                if gate.baseline == Baseline::Project
                    && gate.aggregation != MetricAggregation::Total
                    && MetricAggregation::is_supported(gate.metric) =>
            {
                debug!(gate = %gate.name(), "using custom aggregation");
                match aggregate(root, gate.metric, gate.aggregation) {
                    Ok(value) => value,
                    Err(error) => {
                        log.log_error(format!("Cannot aggregate {}: {error}", gate.name()));
                        None
                    }
                }
            }
            _ => self.statistics.get_value(gate.baseline, gate.metric),
        }
    }
}
