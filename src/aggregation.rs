//! Custom aggregation of scalar metrics over the leaves of a tree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CovmetricsError, Result};
use crate::metric::{normalize_name, Metric};
use crate::node::Node;
use crate::value::Value;

/// How the leaf values of a metric are combined into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetricAggregation {
    /// The tree aggregate, i.e. the sum of all values.
    #[default]
    Total,
    Maximum,
    Average,
}

impl MetricAggregation {
    pub const ALL: [MetricAggregation; 3] = [
        MetricAggregation::Total,
        MetricAggregation::Maximum,
        MetricAggregation::Average,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricAggregation::Total => "total",
            MetricAggregation::Maximum => "maximum",
            MetricAggregation::Average => "average",
        }
    }

    /// Coverage metrics are always totals; only scalar metrics may be
    /// aggregated differently.
    pub fn is_supported(metric: Metric) -> bool {
        !metric.is_coverage()
    }
}

impl fmt::Display for MetricAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricAggregation {
    type Err = CovmetricsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = normalize_name(s);
        let name = match name.as_str() {
            "max" => "maximum",
            "avg" | "mean" => "average",
            "sum" => "total",
            other => other,
        };
        MetricAggregation::ALL
            .into_iter()
            .find(|a| a.as_str() == name)
            .ok_or_else(|| CovmetricsError::Parse(format!("Unknown aggregation: '{s}'")))
    }
}

impl TryFrom<String> for MetricAggregation {
    type Error = CovmetricsError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetricAggregation> for String {
    fn from(aggregation: MetricAggregation) -> Self {
        aggregation.as_str().to_string()
    }
}

/// Collects the values of `metric` the aggregation runs over.
///
/// Classes and methods contribute their own value and everything beneath
/// them. Any other node contributes the values of its children, or its own
/// value when no child has one.
pub fn collect_leaf_values(node: &Node, metric: Metric) -> Vec<Value> {
    let own = node.own_value(metric);
    let children: Vec<Value> = node
        .children()
        .iter()
        .flat_map(|child| collect_leaf_values(child, metric))
        .collect();
    if node.kind().collects_all_values() {
        own.into_iter().chain(children).collect()
    } else if children.is_empty() {
        own.into_iter().collect()
    } else {
        children
    }
}

/// Aggregates `metric` over the tree. `None` when the tree has no value for
/// the metric.
pub fn aggregate(root: &Node, metric: Metric, aggregation: MetricAggregation) -> Result<Option<Value>> {
    if aggregation == MetricAggregation::Total || !MetricAggregation::is_supported(metric) {
        return root.get_value(metric);
    }
    let values = collect_leaf_values(root, metric);
    let Some((first, rest)) = values.split_first() else {
        return Ok(None);
    };
    match aggregation {
        MetricAggregation::Maximum => rest
            .iter()
            .try_fold(*first, |max, value| max.checked_max(value))
            .map(Some),
        _ => {
            let sum = rest
                .iter()
                .fold(first.as_fraction(), |sum, value| sum + value.as_fraction());
            Ok(sum
                .divide_by(values.len())
                .map(|average| Value::scalar(metric, average)))
        }
    }
}
