#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Pass/fail checks over an [`ExecutionCapture`].

use std::fmt::Display;

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::capture::{CallOutcome, ExecutionCapture};

/// Result of one assertion: pass/fail and an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Whether the property held.
    passed:  bool,
    /// Human-readable explanation.
    message: String,
}

/// A failed [`Outcome`] turned into an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AssertionFailed(pub String);

impl Outcome {
    /// A passing outcome.
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed:  true,
            message: message.into(),
        }
    }

    /// A failing outcome.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed:  false,
            message: message.into(),
        }
    }

    /// Whether the property held.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// The explanation.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Replaces the message of a failing outcome; passing outcomes are
    /// returned unchanged.
    pub fn or_message(self, message: Option<&str>) -> Self {
        match message {
            Some(custom) if !self.passed => Self::fail(custom),
            _ => self,
        }
    }

    /// `Ok(())` on pass, the message as an error on failure.
    pub fn into_result(self) -> Result<(), AssertionFailed> {
        if self.passed {
            Ok(())
        } else {
            Err(AssertionFailed(self.message))
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "{status}: {}", self.message)
    }
}

/// Passes when the trimmed output is non-empty.
pub fn output_non_empty(capture: &ExecutionCapture) -> Outcome {
    if capture.stdout().trim().is_empty() {
        Outcome::fail("Expected some output, got empty output")
    } else {
        Outcome::pass("Submission printed output")
    }
}

/// Passes when the output contains `needle`, optionally ignoring case.
pub fn output_contains(capture: &ExecutionCapture, needle: &str, ignore_case: bool) -> Outcome {
    let found = if ignore_case {
        capture
            .stdout()
            .to_lowercase()
            .contains(&needle.to_lowercase())
    } else {
        capture.stdout().contains(needle)
    };

    if found {
        Outcome::pass(format!("Output mentions '{needle}'"))
    } else {
        Outcome::fail(format!("Output should mention '{needle}'"))
    }
}

/// Passes when `name` is bound at the top level.
pub fn symbol_defined(capture: &ExecutionCapture, name: &str) -> Outcome {
    if capture.namespace().contains(name) {
        Outcome::pass(format!("`{name}` is defined"))
    } else {
        Outcome::fail(format!("Expected `{name}` to be defined"))
    }
}

/// Passes when the probe `name(*args)` returned a value equal to `expected`.
///
/// The probe must have been requested for the execution that produced
/// `capture`. Numbers compare by value, so `5` equals `5.0`.
pub fn call_result(
    capture: &ExecutionCapture,
    name: &str,
    args: &[Value],
    expected: &Value,
) -> Outcome {
    let call = render_call(name, args);
    let should = format!("{call} should be {expected}");

    let Some(record) = capture.call(name, args) else {
        return Outcome::fail(format!("{should}, but {call} was never evaluated"));
    };

    match &record.outcome {
        CallOutcome::Returned {
            value: Some(actual),
            ..
        } if values_equal(actual, expected) => Outcome::pass(format!("{call} returned {expected}")),
        CallOutcome::Returned {
            value: Some(actual),
            ..
        } => Outcome::fail(format!("{should}, got {actual}")),
        CallOutcome::Returned {
            type_name, repr, ..
        } => Outcome::fail(format!("{should}, got {repr} ({type_name})")),
        CallOutcome::Raised {
            exception, message, ..
        } => Outcome::fail(format!("{should}, but it raised {exception}: {message}")),
        CallOutcome::Missing => Outcome::fail(format!("{should}, but `{name}` is not defined")),
        CallOutcome::NotCallable { type_name } => Outcome::fail(format!(
            "{should}, but `{name}` is a {type_name}, not a function"
        )),
    }
}

/// Formats `name(a, b)` with JSON-rendered arguments.
fn render_call(name: &str, args: &[Value]) -> String {
    format!("{name}({})", args.iter().join(", "))
}

/// JSON equality where numbers compare numerically and booleans count as
/// `0`/`1` against numbers.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Number(_)) => values_equal(&Value::from(u8::from(*x)), b),
        (Value::Number(_), Value::Bool(y)) => values_equal(a, &Value::from(u8::from(*y))),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
