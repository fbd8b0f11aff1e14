pub mod aggregation;
pub mod changes;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod format;
pub mod fraction;
pub mod gate;
pub mod log;
pub mod merge;
pub mod metric;
pub mod node;
pub mod report;
pub mod reporter;
pub mod statistics;
pub mod value;
