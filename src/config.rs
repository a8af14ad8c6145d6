#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Process-wide configuration read from the environment.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

/// Where the grading container places the student's file.
pub const DEFAULT_SUBMISSION: &str = "/hydrae/main.py";

/// Default wall-clock limit for one execution of a submission.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration shared across the crate.
#[derive(Debug, Clone)]
pub struct ConfigState {
    /// Path of the submission graded when no override is given.
    submission:    PathBuf,
    /// Wall-clock limit for one execution.
    timeout:       Duration,
    /// Explicit interpreter to use instead of searching `PATH`.
    python:        Option<PathBuf>,
    /// Directory scanned for `*/exercise.json` manifests.
    exercises_dir: Option<PathBuf>,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            submission:    PathBuf::from(DEFAULT_SUBMISSION),
            timeout:       Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            python:        None,
            exercises_dir: None,
        }
    }
}

impl ConfigState {
    /// Construct a new configuration instance from environment variables.
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            submission:    read_path("HYDRAE_SUBMISSION").unwrap_or(defaults.submission),
            timeout:       read_timeout_secs("HYDRAE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            python:        read_path("HYDRAE_PYTHON"),
            exercises_dir: read_path("HYDRAE_EXERCISES_DIR"),
        }
    }

    /// Returns the default submission path.
    pub fn submission(&self) -> &Path {
        &self.submission
    }

    /// Returns the execution timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the interpreter override, if any.
    pub fn python(&self) -> Option<&Path> {
        self.python.as_deref()
    }

    /// Returns the manifest directory, if configured.
    pub fn exercises_dir(&self) -> Option<&Path> {
        self.exercises_dir.as_deref()
    }

    /// Returns a copy with a different submission path.
    pub fn with_submission(mut self, submission: impl Into<PathBuf>) -> Self {
        self.submission = submission.into();
        self
    }

    /// Returns a copy with a different execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Shared configuration handle used throughout the crate.
#[derive(Clone)]
pub struct ConfigHandle(Arc<ConfigState>);

impl std::ops::Deref for ConfigHandle {
    type Target = ConfigState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Global storage for the lazily constructed configuration state.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<ConfigState>>>> = OnceLock::new();

/// Returns the mutex guarding the global configuration slot.
fn slot() -> &'static Mutex<Option<Arc<ConfigState>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Returns the active configuration, initializing it from the environment on
/// demand.
pub fn get() -> ConfigHandle {
    let mut guard = slot().lock().expect("config slot poisoned");
    if let Some(cfg) = guard.as_ref() {
        return ConfigHandle(Arc::clone(cfg));
    }

    let cfg = Arc::new(ConfigState::from_env());
    tracing::debug!(?cfg, "initialized configuration");
    *guard = Some(Arc::clone(&cfg));
    ConfigHandle(cfg)
}

/// Replaces the active configuration, e.g. with CLI overrides applied.
pub fn install(state: ConfigState) {
    *slot().lock().expect("config slot poisoned") = Some(Arc::new(state));
}

/// Returns the configured default submission path.
pub fn submission() -> PathBuf {
    get().submission().to_path_buf()
}

/// Returns the configured execution timeout.
pub fn timeout() -> Duration {
    get().timeout()
}

/// Returns the configured interpreter override.
pub fn python() -> Option<PathBuf> {
    get().python().map(Path::to_path_buf)
}

/// Returns the configured manifest directory.
pub fn exercises_dir() -> Option<PathBuf> {
    get().exercises_dir().map(Path::to_path_buf)
}

/// Reads a non-empty path from an environment variable.
fn read_path(env: &str) -> Option<PathBuf> {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default_secs` when parsing fails, the value is zero, or the variable is
/// missing.
fn read_timeout_secs(env: &str, default_secs: u64) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_hydrae_workdir() {
        let cfg = ConfigState::default();
        assert_eq!(cfg.submission(), Path::new("/hydrae/main.py"));
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert!(cfg.python().is_none());
        assert!(cfg.exercises_dir().is_none());
    }

    #[test]
    fn timeout_falls_back_when_unset() {
        let timeout = read_timeout_secs("HYDRAE_TEST_TIMEOUT_NEVER_SET", 7);
        assert_eq!(timeout, Duration::from_secs(7));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = ConfigState::default()
            .with_submission("/tmp/x/main.py")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(cfg.submission(), Path::new("/tmp/x/main.py"));
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
    }
}
