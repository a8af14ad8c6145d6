#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use bon::Builder;
use serde::{Deserialize, Serialize};
use tabled::{
    Table, Tabled,
    settings::{Modify, Style, Width, object::Columns},
};

use super::assertions::Outcome;

#[derive(Tabled, Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
/// The independently reportable result of one check
pub struct CheckResult {
    #[tabled(rename = "Exercise")]
    /// * `exercise`: id of the exercise the check belongs to
    pub(crate) exercise: String,
    #[tabled(rename = "Check")]
    /// * `name`: name of the check
    pub(crate) name:     String,
    #[tabled(rename = "Passed")]
    /// * `passed`: whether every assertion in the check held
    pub(crate) passed:   bool,
    #[tabled(rename = "Message")]
    /// * `message`: explanation of the first failure, or of success
    pub(crate) message:  String,
}

impl CheckResult {
    /// Builds a result from the outcome that decided the check.
    pub fn from_outcome(
        exercise: impl Into<String>,
        name: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            exercise: exercise.into(),
            name:     name.into(),
            passed:   outcome.passed(),
            message:  outcome.message().to_string(),
        }
    }

    /// Id of the exercise.
    pub fn exercise(&self) -> &str {
        &self.exercise
    }

    /// Name of the check.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the check passed.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Explanation.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Whether every check passed.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(CheckResult::passed)
}

/// Renders results as a table, one row per check.
pub fn render_table(results: &[CheckResult]) -> String {
    Table::new(results)
        .with(Style::modern())
        .with(Modify::new(Columns::last()).with(Width::wrap(60)))
        .to_string()
}
