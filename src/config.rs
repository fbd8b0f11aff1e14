//! Recorder configuration loaded from TOML.
//!
//! ```toml
//! ignore_parsing_errors = true
//!
//! [[quality_gates]]
//! metric = "line"
//! threshold = 80.0
//!
//! [[quality_gates]]
//! metric = "cyclomatic_complexity"
//! baseline = "modified_files"
//! aggregation = "maximum"
//! threshold = 10.0
//! criticality = "failure"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gate::CoverageQualityGate;
use crate::merge::ProcessingMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecorderConfig {
    /// Keep going when reports conflict instead of failing the step.
    #[serde(default)]
    pub ignore_parsing_errors: bool,
    /// Gates in evaluation order.
    #[serde(default)]
    pub quality_gates: Vec<CoverageQualityGate>,
}

impl RecorderConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::from_ignore_errors(self.ignore_parsing_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::MetricAggregation;
    use crate::error::CovmetricsError;
    use crate::gate::QualityGateCriticality;
    use crate::metric::Metric;
    use crate::statistics::Baseline;

    #[test]
    fn test_parse_config() {
        let config = RecorderConfig::from_toml(
            r#"
ignore_parsing_errors = true

[[quality_gates]]
metric = "line"
threshold = 80.0

[[quality_gates]]
metric = "cyclomatic-complexity"
baseline = "modified_files"
aggregation = "maximum"
threshold = 10
criticality = "FAILURE"
"#,
        )
        .unwrap();

        assert_eq!(config.processing_mode(), ProcessingMode::IgnoreErrors);
        assert_eq!(config.quality_gates.len(), 2);
        let first = &config.quality_gates[0];
        assert_eq!(first.metric, Metric::Line);
        assert_eq!(first.baseline, Baseline::Project);
        assert_eq!(first.criticality, QualityGateCriticality::Unstable);
        let second = &config.quality_gates[1];
        assert_eq!(second.metric, Metric::CyclomaticComplexity);
        assert_eq!(second.baseline, Baseline::ModifiedFiles);
        assert_eq!(second.aggregation, MetricAggregation::Maximum);
        assert_eq!(second.threshold, 10.0);
        assert_eq!(second.criticality, QualityGateCriticality::Failure);
    }

    #[test]
    fn test_empty_config() {
        let config = RecorderConfig::from_toml("").unwrap();
        assert_eq!(config, RecorderConfig::default());
        assert_eq!(config.processing_mode(), ProcessingMode::FailFast);
    }

    #[test]
    fn test_unknown_baseline_is_rejected() {
        let err = RecorderConfig::from_toml(
            r#"
[[quality_gates]]
metric = "line"
baseline = "indirect_delta"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CovmetricsError::Toml(_)));
        assert!(err.to_string().contains("No such baseline"));
    }
}
