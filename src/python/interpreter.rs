#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Locating a Python interpreter.
//!
//! Lookup order:
//! - an explicit override (`HYDRAE_PYTHON`)
//! - `python3`, then `python` on `PATH`
//! - `uv run --no-project -- python`, when only `uv` is installed

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use which::which;

use crate::{config, error::ExecuteError};

/// A resolved interpreter command: the program plus any arguments that must
/// precede the interpreter's own flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Executable to spawn.
    program: PathBuf,
    /// Arguments placed before the interpreter flags.
    prefix:  Vec<OsString>,
}

impl Interpreter {
    /// Uses `program` directly as the interpreter.
    pub fn at(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix:  Vec::new(),
        }
    }

    /// Runs Python through `uv`, outside any project environment.
    pub fn via_uv(uv: impl Into<PathBuf>) -> Self {
        Self {
            program: uv.into(),
            prefix:  vec!["run".into(), "--no-project".into(), "--".into(), "python".into()],
        }
    }

    /// Finds an interpreter using the configured override or `PATH`.
    pub fn discover() -> Result<Self, ExecuteError> {
        if let Some(python) = config::python() {
            tracing::debug!(python = %python.display(), "using configured interpreter");
            return Ok(Self::at(python));
        }

        for name in ["python3", "python"] {
            if let Ok(path) = which(name) {
                return Ok(Self::at(path));
            }
        }

        if let Ok(uv) = which("uv") {
            tracing::debug!("no python on PATH, falling back to uv");
            return Ok(Self::via_uv(uv));
        }

        Err(ExecuteError::InterpreterNotFound {
            tried: "HYDRAE_PYTHON, python3, python, uv".to_string(),
        })
    }

    /// Executable to spawn.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument list that runs `driver` with `extra` as its
    /// `sys.argv[1..]`.
    ///
    /// `-B` keeps the child from writing `__pycache__` next to the
    /// submission.
    pub fn driver_args(&self, driver: &str, extra: &[OsString]) -> Vec<OsString> {
        let mut args = self.prefix.clone();
        args.push("-B".into());
        args.push("-c".into());
        args.push(driver.into());
        args.extend(extra.iter().cloned());
        args
    }
}
