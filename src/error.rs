use thiserror::Error;

use crate::metric::{Metric, NodeKind};

#[derive(Error, Debug)]
pub enum CovmetricsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Cannot merge '{path}': {message}")]
    MergeConflict { path: String, message: String },

    #[error("A {parent} node cannot contain a {child} node")]
    IllegalChild { parent: NodeKind, child: NodeKind },

    #[error("Cannot combine values of different metrics: {left} and {right}")]
    MetricMismatch { left: Metric, right: Metric },

    #[error(
        "Changed files '{first}' and '{second}' both map to report path '{report_path}'"
    )]
    AmbiguousChange {
        report_path: String,
        first: String,
        second: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CovmetricsError>;
