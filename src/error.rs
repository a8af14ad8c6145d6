#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Errors raised while executing a submission.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::process::ProcessError;

/// Why a submission could not produce an execution capture.
#[derive(Error, Debug)]
pub enum ExecuteError {
    /// Nothing exists at the submission path.
    #[error("Submission not found at {}", path.display())]
    MissingSubmission {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// No Python interpreter could be located.
    #[error("Could not find a Python interpreter (tried {tried})")]
    InterpreterNotFound {
        /// Human-readable list of what was searched.
        tried: String,
    },

    /// The child process could not be run.
    #[error(transparent)]
    Process(ProcessError),

    /// The submission ran past its wall-clock limit and was killed.
    #[error("Execution timed out after {timeout:?}")]
    TimedOut {
        /// Limit that was exceeded.
        timeout: Duration,
    },

    /// The submission does not compile.
    #[error("Syntax error in {file_name}:\n{message}")]
    Syntax {
        /// Name of the submission file.
        file_name: String,
        /// Interpreter's description of the error.
        message:   String,
    },

    /// Top-level code raised an exception.
    #[error("Runtime error in {file_name}:\n{traceback}")]
    Raised {
        /// Name of the submission file.
        file_name: String,
        /// Exception class name.
        exception: String,
        /// Formatted traceback.
        traceback: String,
        /// Output written before the exception.
        stdout:    String,
    },

    /// Top-level code called `sys.exit` with a failure code.
    #[error("{file_name} exited with status {code}")]
    Exited {
        /// Name of the submission file.
        file_name: String,
        /// Exit code as reported by the interpreter.
        code:      String,
        /// Output written before exiting.
        stdout:    String,
    },

    /// The file the driver writes its report to could not be created or read.
    #[error("Could not use the execution report file")]
    ReportFile(#[source] std::io::Error),

    /// The driver wrote a report that could not be decoded.
    #[error("Malformed execution report: {0}")]
    MalformedReport(#[from] serde_json::Error),

    /// The driver died without writing a report.
    #[error("Interpreter exited ({status}) without a report:\n{stderr}")]
    DriverCrashed {
        /// Exit status of the child.
        status: String,
        /// Whatever the child wrote to stderr.
        stderr: String,
    },
}

impl From<ProcessError> for ExecuteError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::TimedOut(timeout) => ExecuteError::TimedOut { timeout },
            other => ExecuteError::Process(other),
        }
    }
}
