//! Stateless text rendering of values and deltas.
//!
//! Every function takes its options explicitly; nothing here keeps state
//! between calls.

use crate::fraction::Fraction;
use crate::value::Value;

/// Rendering options. The defaults produce the English format used in gate
/// messages: two decimals and a `.` separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub decimals: usize,
    pub decimal_separator: char,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            decimals: 2,
            decimal_separator: '.',
        }
    }
}

impl FormatOptions {
    fn decimal(&self, value: f64) -> String {
        let text = format!("{:.*}", self.decimals, value);
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

/// Formats a value with the default options.
pub fn format_value(value: &Value) -> String {
    format_value_with(value, &FormatOptions::default())
}

pub fn format_value_with(value: &Value, options: &FormatOptions) -> String {
    match value {
        Value::Coverage(c) if !c.is_set() => "-".to_string(),
        Value::Coverage(c) => format!("{}%", options.decimal(c.covered_percentage().to_f64())),
        Value::Scalar(s) => format_amount(s.value, options),
        Value::Difference(d) if d.metric.is_coverage() => {
            format!("{}%", signed(d.value, options.decimal(d.value.abs().to_f64())))
        }
        Value::Difference(d) => signed(d.value, format_amount(d.value.abs(), options)),
    }
}

/// Integers render without decimals, everything else with the configured
/// number of decimals.
fn format_amount(amount: Fraction, options: &FormatOptions) -> String {
    if amount.is_integer() {
        amount.to_string()
    } else {
        options.decimal(amount.to_f64())
    }
}

/// Prefixes an unsigned magnitude with the sign of `value`; zero stays unsigned.
fn signed(value: Fraction, magnitude: String) -> String {
    if value.is_zero() {
        magnitude
    } else if value.is_negative() {
        format!("-{magnitude}")
    } else {
        format!("+{magnitude}")
    }
}

/// Formats a value together with its counters, e.g. `75.00% (3/4)`.
pub fn format_details(value: &Value) -> String {
    match value {
        Value::Coverage(c) if c.is_set() => {
            format!("{} ({}/{})", format_value(value), c.covered, c.total())
        }
        _ => format_value(value),
    }
}

/// Formats a gate threshold.
pub fn format_threshold(threshold: f64) -> String {
    FormatOptions::default().decimal(threshold)
}
