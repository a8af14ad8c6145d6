#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Declarative exercises: named checks, each a sequence of expectations
//! evaluated against its own fresh execution of the submission.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    assertions::{self, Outcome},
    results::CheckResult,
};
use crate::{
    capture::ExecutionCapture,
    submission::{Execution, Probe, Submission},
};

/// One property to assert about a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// Trimmed output is non-empty.
    OutputNonEmpty {
        /// Failure message override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Output contains a substring.
    OutputContains {
        /// Substring to look for.
        needle:      String,
        /// Compare case-insensitively.
        #[serde(default)]
        ignore_case: bool,
        /// Failure message override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message:     Option<String>,
    },
    /// A top-level name is bound.
    SymbolDefined {
        /// Name to look up.
        name:    String,
        /// Failure message override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Calling a top-level function returns an expected value.
    CallResult {
        /// Function name.
        name:     String,
        /// Positional arguments.
        #[serde(default)]
        args:     Vec<Value>,
        /// Expected return value.
        expected: Value,
        /// Failure message override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message:  Option<String>,
    },
}

impl Expectation {
    /// The probe this expectation needs the child to perform, if any.
    pub fn probe(&self) -> Option<Probe> {
        match self {
            Expectation::CallResult { name, args, .. } => {
                Some(Probe::new(name.clone(), args.iter().cloned()))
            }
            _ => None,
        }
    }

    /// Evaluates the expectation against a capture.
    pub fn evaluate(&self, capture: &ExecutionCapture) -> Outcome {
        match self {
            Expectation::OutputNonEmpty { message } => {
                assertions::output_non_empty(capture).or_message(message.as_deref())
            }
            Expectation::OutputContains {
                needle,
                ignore_case,
                message,
            } => assertions::output_contains(capture, needle, *ignore_case)
                .or_message(message.as_deref()),
            Expectation::SymbolDefined { name, message } => {
                assertions::symbol_defined(capture, name).or_message(message.as_deref())
            }
            Expectation::CallResult {
                name,
                args,
                expected,
                message,
            } => assertions::call_result(capture, name, args, expected)
                .or_message(message.as_deref()),
        }
    }
}

/// A named group of expectations sharing one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Name reported with the result.
    pub name:         String,
    /// Evaluated in order; the first failure decides the check.
    pub expectations: Vec<Expectation>,
    /// Text fed to the submission's stdin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin:        Option<String>,
}

impl Check {
    /// Creates a check with no stdin.
    pub fn new(name: impl Into<String>, expectations: Vec<Expectation>) -> Self {
        Self {
            name: name.into(),
            expectations,
            stdin: None,
        }
    }

    /// Probes needed by this check's call expectations, without duplicates.
    pub fn probes(&self) -> Vec<Probe> {
        let mut probes: Vec<Probe> = Vec::new();
        for probe in self.expectations.iter().filter_map(Expectation::probe) {
            if !probes.contains(&probe) {
                probes.push(probe);
            }
        }
        probes
    }

    /// Evaluates every expectation in order against `capture`, stopping at
    /// the first failure.
    pub fn evaluate(&self, capture: &ExecutionCapture) -> Outcome {
        let mut last = Outcome::pass("All assertions passed");
        for expectation in &self.expectations {
            let outcome = expectation.evaluate(capture);
            if !outcome.passed() {
                return outcome;
            }
            last = outcome;
        }
        last
    }
}

/// A graded unit: a submission convention plus independent checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Stable identifier, e.g. `py.basics.001`.
    pub id:         String,
    /// Short human-readable title.
    #[serde(default)]
    pub title:      String,
    /// Submission path, overriding the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<PathBuf>,
    /// Checks, each run against its own execution.
    pub checks:     Vec<Check>,
}

impl Exercise {
    /// Loads an exercise manifest. A relative `submission` is resolved
    /// against the manifest's directory.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read exercise manifest {}", path.display()))?;
        let mut exercise: Exercise = serde_json::from_str(&text)
            .with_context(|| format!("Invalid exercise manifest {}", path.display()))?;

        if let Some(submission) = exercise.submission.take() {
            let resolved = match path.parent() {
                Some(dir) if submission.is_relative() => dir.join(submission),
                _ => submission,
            };
            exercise.submission = Some(resolved);
        }
        Ok(exercise)
    }

    /// The submission this exercise grades when the caller doesn't pick one.
    pub fn default_submission(&self) -> Submission {
        match &self.submission {
            Some(path) => Submission::at(path),
            None => Submission::from_config(),
        }
    }

    /// Runs every check against `submission`, each with a fresh execution.
    ///
    /// An execution failure fails only the check that needed it.
    pub async fn run(&self, submission: &Submission) -> Vec<CheckResult> {
        self.run_with_timeout(submission, None).await
    }

    /// Like [`Exercise::run`], with an explicit per-execution timeout.
    pub async fn run_with_timeout(
        &self,
        submission: &Submission,
        timeout: Option<Duration>,
    ) -> Vec<CheckResult> {
        tracing::info!(exercise = %self.id, submission = %submission.path().display(), "grading");

        let mut results = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let execution = Execution::builder()
                .submission(submission.clone())
                .probes(check.probes())
                .maybe_stdin(check.stdin.clone())
                .maybe_timeout(timeout)
                .build();

            let outcome = match execution.run().await {
                Ok(capture) => check.evaluate(&capture),
                Err(err) => {
                    tracing::debug!(check = %check.name, error = %err, "execution failed");
                    Outcome::fail(err.to_string())
                }
            };

            tracing::info!(check = %check.name, passed = outcome.passed());
            results.push(CheckResult::from_outcome(&self.id, &check.name, outcome));
        }
        results
    }
}
