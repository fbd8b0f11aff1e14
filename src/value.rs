//! Typed metric values: coverage counters, scalar measurements and signed
//! differences against a reference.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CovmetricsError, Result};
use crate::fraction::Fraction;
use crate::metric::{Metric, Tendency};

/// Covered and missed counters of a coverage metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coverage {
    pub metric: Metric,
    pub covered: u64,
    pub missed: u64,
}

impl Coverage {
    pub fn new(metric: Metric, covered: u64, missed: u64) -> Self {
        Self {
            metric,
            covered,
            missed,
        }
    }

    pub fn total(&self) -> u64 {
        self.covered + self.missed
    }

    /// A coverage without any counted element carries no information.
    pub fn is_set(&self) -> bool {
        self.total() > 0
    }

    /// Covered percentage in the range 0..=100; zero when unset.
    pub fn covered_percentage(&self) -> Fraction {
        let covered = i64::try_from(self.covered).unwrap_or(i64::MAX);
        let total = i64::try_from(self.total()).unwrap_or(i64::MAX);
        covered
            .checked_mul(100)
            .and_then(|c| Fraction::ratio(c, total))
            .unwrap_or(Fraction::ZERO)
    }
}

/// A single count or ratio without a covered/missed split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scalar {
    pub metric: Metric,
    pub value: Fraction,
}

impl Scalar {
    pub fn new(metric: Metric, value: Fraction) -> Self {
        Self { metric, value }
    }
}

/// `current - reference` for one metric. For coverage metrics the amount is
/// a difference in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Difference {
    pub metric: Metric,
    pub value: Fraction,
}

impl Difference {
    pub fn new(metric: Metric, value: Fraction) -> Self {
        Self { metric, value }
    }

    pub fn from_integer(metric: Metric, value: i64) -> Self {
        Self::new(metric, Fraction::from_integer(value))
    }

    pub fn negate(&self) -> Self {
        Self::new(self.metric, -self.value)
    }
}

/// A metric measurement. Every value carries exactly one metric tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawValue", into = "RawValue")]
pub enum Value {
    Coverage(Coverage),
    Scalar(Scalar),
    Difference(Difference),
}

impl Value {
    pub fn coverage(metric: Metric, covered: u64, missed: u64) -> Self {
        Value::Coverage(Coverage::new(metric, covered, missed))
    }

    pub fn integer(metric: Metric, value: i64) -> Self {
        Value::Scalar(Scalar::new(metric, Fraction::from_integer(value)))
    }

    pub fn scalar(metric: Metric, value: Fraction) -> Self {
        Value::Scalar(Scalar::new(metric, value))
    }

    pub fn difference(metric: Metric, value: Fraction) -> Self {
        Value::Difference(Difference::new(metric, value))
    }

    pub fn metric(&self) -> Metric {
        match self {
            Value::Coverage(c) => c.metric,
            Value::Scalar(s) => s.metric,
            Value::Difference(d) => d.metric,
        }
    }

    /// The exact comparison magnitude: a percentage for coverage, the raw
    /// amount otherwise.
    pub fn as_fraction(&self) -> Fraction {
        match self {
            Value::Coverage(c) => c.covered_percentage(),
            Value::Scalar(s) => s.value,
            Value::Difference(d) => d.value,
        }
    }

    pub fn as_double(&self) -> f64 {
        self.as_fraction().to_f64()
    }

    /// Value rounded to two decimals.
    pub fn as_rounded(&self) -> f64 {
        (self.as_double() * 100.0).round() / 100.0
    }

    pub fn as_coverage(&self) -> Option<&Coverage> {
        match self {
            Value::Coverage(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the value violates a threshold. Larger-is-better metrics treat
    /// the threshold as a floor (`value < threshold`), smaller-is-better
    /// metrics as a ceiling (`value > threshold`). A NaN threshold is never
    /// satisfied.
    pub fn is_out_of_valid_range(&self, threshold: f64) -> bool {
        let ordering = match Fraction::from_f64(threshold) {
            Some(limit) => self.as_fraction().cmp(&limit),
            None => match self.as_double().partial_cmp(&threshold) {
                Some(ordering) => ordering,
                None => return true,
            },
        };
        match self.metric().tendency() {
            Tendency::LargerIsBetter => ordering == Ordering::Less,
            Tendency::SmallerIsBetter => ordering == Ordering::Greater,
        }
    }

    fn ensure_same_metric(&self, other: &Value) -> Result<()> {
        if self.metric() == other.metric() {
            Ok(())
        } else {
            Err(CovmetricsError::MetricMismatch {
                left: self.metric(),
                right: other.metric(),
            })
        }
    }

    /// Sums two values of the same metric.
    pub fn add(&self, other: &Value) -> Result<Value> {
        self.ensure_same_metric(other)?;
        match (self, other) {
            (Value::Coverage(a), Value::Coverage(b)) => Ok(Value::coverage(
                a.metric,
                a.covered + b.covered,
                a.missed + b.missed,
            )),
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::scalar(a.metric, a.value + b.value)),
            (Value::Difference(a), Value::Difference(b)) => {
                Ok(Value::difference(a.metric, a.value + b.value))
            }
            _ => Err(CovmetricsError::Other(format!(
                "Cannot add {self:?} and {other:?}: different value shapes"
            ))),
        }
    }

    /// The greater of two values of the same metric, compared by magnitude.
    pub fn checked_max(&self, other: &Value) -> Result<Value> {
        self.ensure_same_metric(other)?;
        if other.as_fraction() > self.as_fraction() {
            Ok(*other)
        } else {
            Ok(*self)
        }
    }

    /// Computes `self - reference`.
    pub fn delta(&self, reference: &Value) -> Result<Difference> {
        self.ensure_same_metric(reference)?;
        Ok(Difference::new(
            self.metric(),
            self.as_fraction() - reference.as_fraction(),
        ))
    }

    /// Returns the value of `metric` from a list, if any.
    pub fn find(metric: Metric, values: &[Value]) -> Option<Value> {
        values.iter().find(|v| v.metric() == metric).copied()
    }

    fn shape_rank(&self) -> u8 {
        match self {
            Value::Coverage(_) => 0,
            Value::Scalar(_) => 1,
            Value::Difference(_) => 2,
        }
    }

    fn counters(&self) -> (u64, u64) {
        match self {
            Value::Coverage(c) => (c.covered, c.missed),
            _ => (0, 0),
        }
    }
}

impl From<Difference> for Value {
    fn from(d: Difference) -> Self {
        Value::Difference(d)
    }
}

impl From<Coverage> for Value {
    fn from(c: Coverage) -> Self {
        Value::Coverage(c)
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.metric()
            .cmp(&other.metric())
            .then_with(|| self.as_fraction().cmp(&other.as_fraction()))
            .then_with(|| self.shape_rank().cmp(&other.shape_rank()))
            .then_with(|| self.counters().cmp(&other.counters()))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::format_value(self))
    }
}

/// Flat serialized form: `{"metric": "line", "covered": 5, "missed": 5}`,
/// `{"metric": "loc", "value": 30}` or `{"metric": "loc", "delta": -2}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawValue {
    metric: Metric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    covered: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    missed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delta: Option<f64>,
}

fn to_fraction(metric: Metric, amount: f64) -> Result<Fraction> {
    Fraction::from_f64(amount)
        .ok_or_else(|| CovmetricsError::Parse(format!("Invalid amount {amount} for {metric}")))
}

impl TryFrom<RawValue> for Value {
    type Error = CovmetricsError;

    fn try_from(raw: RawValue) -> std::result::Result<Self, Self::Error> {
        let RawValue {
            metric,
            covered,
            missed,
            value,
            delta,
        } = raw;
        if covered.is_some() || missed.is_some() {
            return Ok(Value::coverage(
                metric,
                covered.unwrap_or(0),
                missed.unwrap_or(0),
            ));
        }
        match (value, delta) {
            (Some(amount), _) => Ok(Value::scalar(metric, to_fraction(metric, amount)?)),
            (None, Some(amount)) => Ok(Value::difference(metric, to_fraction(metric, amount)?)),
            (None, None) => Err(CovmetricsError::Parse(format!(
                "Value for {metric} needs covered/missed, value or delta"
            ))),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        let mut raw = RawValue {
            metric: value.metric(),
            covered: None,
            missed: None,
            value: None,
            delta: None,
        };
        match value {
            Value::Coverage(c) => {
                raw.covered = Some(c.covered);
                raw.missed = Some(c.missed);
            }
            Value::Scalar(s) => raw.value = Some(s.value.to_f64()),
            Value::Difference(d) => raw.delta = Some(d.value.to_f64()),
        }
        raw
    }
}
