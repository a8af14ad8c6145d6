#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Python toolchain helpers: finding an interpreter and building the command
//! line that runs a submission under the grading driver.

/// Interpreter discovery.
pub mod interpreter;

pub use interpreter::Interpreter;

/// Program executed inside the child interpreter. It runs the submission,
/// performs requested call probes, writes a JSON report framed by
/// [`REPORT_START`] and [`REPORT_END`] to the file named in its arguments,
/// then exits without running the submission's exit hooks.
pub const DRIVER: &str = include_str!("driver.py");

/// Marker written on its own line before the report.
pub const REPORT_START: &str = "___HYDRAE_GRADE_JSON_START___";

/// Marker written on its own line after the report.
pub const REPORT_END: &str = "___HYDRAE_GRADE_JSON_END___";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_uses_the_same_markers() {
        assert!(DRIVER.contains(REPORT_START));
        assert!(DRIVER.contains(REPORT_END));
    }

    #[test]
    fn driver_skips_exit_hooks() {
        assert!(DRIVER.contains("os._exit(0)"));
    }
}
