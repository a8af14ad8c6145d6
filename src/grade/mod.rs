#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Assertions over captures, declarative exercises, and their results.

/// Pass/fail checks over an execution capture.
pub mod assertions;
/// Built-in exercises and manifest discovery.
pub mod catalog;
/// Exercises, checks and expectations.
pub mod exercise;
/// Reportable check results.
pub mod results;

pub use assertions::{AssertionFailed, Outcome};
pub use exercise::{Check, Exercise, Expectation};
pub use results::CheckResult;
