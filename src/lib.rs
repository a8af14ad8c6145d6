//! # hydrae
//!
//! A grading harness for introductory Python exercises. A submission is run
//! once per check in a fresh child interpreter; what it printed and which
//! top-level names it bound come back as an [`ExecutionCapture`], and
//! assertions in [`grade`] turn that capture into pass/fail results.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// What one execution produced
pub mod capture;
/// Environment-driven configuration
pub mod config;
/// Execution errors
pub mod error;
/// Assertions, exercises and results
pub mod grade;
/// Child process plumbing
pub mod process;
/// Interpreter discovery and the in-child driver
pub mod python;
/// Submissions and executions
pub mod submission;
/// Utility functions for convenience
pub mod util;

pub use capture::{Binding, BindingKind, CallOutcome, CallRecord, ExecutionCapture, Namespace};
pub use error::ExecuteError;
pub use submission::{Execution, Probe, Submission};
