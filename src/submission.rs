#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Running a submission: one fresh child interpreter per execution.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    capture::{DriverReport, ExecutionCapture},
    config,
    error::ExecuteError,
    process::{self, StdinSource},
    python::{DRIVER, Interpreter},
};

/// A call to perform in the child after top-level execution: `name(*args)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    /// Name of the callable in the submission's namespace.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl Probe {
    /// Creates a probe for `name(*args)`.
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }
}

/// A student's source file at a well-known path. Never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Where the file lives.
    path: PathBuf,
}

impl Submission {
    /// Refers to the submission at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Refers to the configured submission path (`/hydrae/main.py` unless
    /// overridden).
    pub fn from_config() -> Self {
        Self::at(config::submission())
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in error messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Executes the submission once with default settings.
    pub async fn execute(&self) -> Result<ExecutionCapture, ExecuteError> {
        Execution::builder()
            .submission(self.clone())
            .build()
            .run()
            .await
    }
}

/// One request to run a submission.
#[derive(Debug, Clone, Builder)]
pub struct Execution {
    /// The file to run.
    submission:  Submission,
    /// Calls to perform after top-level code finishes.
    #[builder(default, with = |probes: impl IntoIterator<Item = Probe>| probes.into_iter().collect())]
    probes:      Vec<Probe>,
    /// Text fed to the submission's stdin. Stdin is closed when absent.
    #[builder(into)]
    stdin:       Option<String>,
    /// Wall-clock limit; the configured timeout when absent.
    timeout:     Option<Duration>,
    /// Interpreter to use; discovered when absent.
    interpreter: Option<Interpreter>,
}

impl Execution {
    /// Runs the submission in a child interpreter and returns what it
    /// printed and defined.
    pub async fn run(self) -> Result<ExecutionCapture, ExecuteError> {
        let file_name = self.submission.file_name();
        let path = tokio::fs::canonicalize(self.submission.path())
            .await
            .map_err(|_| ExecuteError::MissingSubmission {
                path: self.submission.path().to_path_buf(),
            })?;
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ExecuteError::MissingSubmission {
                path: self.submission.path().to_path_buf(),
            });
        }

        let interpreter = match self.interpreter {
            Some(interpreter) => interpreter,
            None => Interpreter::discover()?,
        };

        let report_file = tempfile::Builder::new()
            .prefix("hydrae-report-")
            .suffix(".json")
            .tempfile()
            .map_err(ExecuteError::ReportFile)?;

        let request = serde_json::json!({ "calls": self.probes });
        let args = interpreter.driver_args(DRIVER, &[
            path.clone().into_os_string(),
            report_file.path().as_os_str().to_os_string(),
            OsString::from(request.to_string()),
        ]);
        let env = [
            (OsString::from("PYTHONIOENCODING"), OsString::from("utf-8")),
            (OsString::from("PYTHONDONTWRITEBYTECODE"), OsString::from("1")),
        ];
        let stdin = match self.stdin {
            Some(text) => StdinSource::Bytes(text.into_bytes()),
            None => StdinSource::Null,
        };
        let timeout = self.timeout.unwrap_or_else(config::timeout);

        tracing::debug!(
            submission = %path.display(),
            interpreter = %interpreter.program().display(),
            probes = self.probes.len(),
            ?timeout,
            "executing submission"
        );

        let collected = process::run_collect(
            interpreter.program(),
            &args,
            stdin,
            path.parent(),
            &env,
            Some(timeout),
        )
        .await?;

        let contents = tokio::fs::read_to_string(report_file.path())
            .await
            .map_err(ExecuteError::ReportFile)?;
        let report = match DriverReport::extract(&contents) {
            Some(report) => report?,
            None => {
                let stderr = String::from_utf8_lossy(&collected.stderr).into_owned();
                tracing::warn!(status = %collected.status, "driver produced no report");
                return Err(ExecuteError::DriverCrashed {
                    status: collected.status.to_string(),
                    stderr,
                });
            }
        };

        let capture = report.into_capture(&file_name, collected.elapsed)?;
        tracing::debug!(
            elapsed = ?capture.elapsed(),
            bindings = capture.namespace().len(),
            "execution finished"
        );
        Ok(capture)
    }
}
