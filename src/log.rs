//! A log sink that keeps messages as data.
//!
//! The engine never writes to the console itself: info and error lines are
//! collected in a [`FilteredLog`] that the host prints or stores, and each line
//! is mirrored as a `tracing` event.

use tracing::{error, info};

/// Number of error lines kept before further errors are only counted.
const DEFAULT_MAX_LINES: usize = 20;

/// Collects info and error messages, capping the number of retained errors.
#[derive(Debug, Clone)]
pub struct FilteredLog {
    title: String,
    max_lines: usize,
    info_messages: Vec<String>,
    error_messages: Vec<String>,
    skipped_errors: usize,
}

impl FilteredLog {
    /// Creates a log whose error section starts with `title`.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_max_lines(title, DEFAULT_MAX_LINES)
    }

    pub fn with_max_lines(title: impl Into<String>, max_lines: usize) -> Self {
        Self {
            title: title.into(),
            max_lines,
            info_messages: Vec::new(),
            error_messages: Vec::new(),
            skipped_errors: 0,
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.info_messages.push(message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        if self.error_messages.len() < self.max_lines {
            self.error_messages.push(message);
        } else {
            self.skipped_errors += 1;
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn info_messages(&self) -> &[String] {
        &self.info_messages
    }

    /// Error lines, followed by a summary line when errors were dropped.
    pub fn error_messages(&self) -> Vec<String> {
        let mut messages = self.error_messages.clone();
        if self.skipped_errors > 0 {
            messages.push(format!(
                "  ... skipped logging of {} additional errors ...",
                self.skipped_errors
            ));
        }
        messages
    }

    pub fn has_errors(&self) -> bool {
        !self.error_messages.is_empty()
    }

    /// Appends all messages of `other` without emitting them again.
    pub fn merge(&mut self, other: FilteredLog) {
        self.info_messages.extend(other.info_messages);
        for message in other.error_messages {
            if self.error_messages.len() < self.max_lines {
                self.error_messages.push(message);
            } else {
                self.skipped_errors += 1;
            }
        }
        self.skipped_errors += other.skipped_errors;
    }
}

impl Default for FilteredLog {
    fn default() -> Self {
        Self::new("Errors while computing coverage statistics:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_messages() {
        let mut log = FilteredLog::new("Errors");
        log.log_info("one");
        log.log_error("bad");
        assert_eq!(log.info_messages(), ["one"]);
        assert_eq!(log.error_messages(), vec!["bad".to_string()]);
        assert!(log.has_errors());
        assert_eq!(log.title(), "Errors");
    }

    #[test]
    fn test_caps_error_lines() {
        let mut log = FilteredLog::with_max_lines("Errors", 2);
        for i in 0..5 {
            log.log_error(format!("error {i}"));
        }
        let errors = log.error_messages();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[1], "error 1");
        assert!(errors[2].contains("3 additional errors"));
    }

    #[test]
    fn test_merge() {
        let mut log = FilteredLog::new("Errors");
        log.log_info("first");
        let mut other = FilteredLog::new("Other");
        other.log_info("second");
        other.log_error("failure");
        log.merge(other);
        assert_eq!(log.info_messages(), ["first", "second"]);
        assert_eq!(log.error_messages(), vec!["failure".to_string()]);
    }
}
