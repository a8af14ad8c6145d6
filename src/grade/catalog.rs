#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Known exercises: the built-in set plus any manifests found on disk.

use std::path::Path;

use anyhow::{Result, bail};
use serde_json::json;

use super::exercise::{Check, Exercise, Expectation};
use crate::{config, util::find_files};

/// `py.basics.001`: print something that mentions Hydrae.
fn py_basics_001() -> Exercise {
    Exercise {
        id:         "py.basics.001".to_string(),
        title:      "Say hello".to_string(),
        submission: None,
        checks:     vec![
            Check::new("prints_something", vec![Expectation::OutputNonEmpty {
                message: None,
            }]),
            Check::new("mentions_hydrae", vec![Expectation::OutputContains {
                needle:      "hydrae".to_string(),
                ignore_case: true,
                message:     Some("Output should mention 'Hydrae'".to_string()),
            }]),
        ],
    }
}

/// `py.basics.002`: define `add(a, b)`.
fn py_basics_002() -> Exercise {
    Exercise {
        id:         "py.basics.002".to_string(),
        title:      "Add two numbers".to_string(),
        submission: None,
        checks:     vec![
            Check::new("add_basic", vec![
                Expectation::SymbolDefined {
                    name:    "add".to_string(),
                    message: Some("Expected function add(a, b) to be defined".to_string()),
                },
                Expectation::CallResult {
                    name:     "add".to_string(),
                    args:     vec![json!(2), json!(3)],
                    expected: json!(5),
                    message:  Some("add(2, 3) should be 5".to_string()),
                },
            ]),
            Check::new("add_negative", vec![Expectation::CallResult {
                name:     "add".to_string(),
                args:     vec![json!(-2), json!(5)],
                expected: json!(3),
                message:  Some("add(-2, 5) should be 3".to_string()),
            }]),
        ],
    }
}

/// Exercises compiled into the binary.
pub fn builtin() -> Vec<Exercise> {
    vec![py_basics_001(), py_basics_002()]
}

/// Loads every `exercise.json` up to two directories below `dir`.
pub async fn discover(dir: &Path) -> Result<Vec<Exercise>> {
    let mut found = Vec::new();
    for path in find_files("json", 2, dir)? {
        if path.file_name().is_some_and(|name| name == "exercise.json") {
            tracing::debug!(manifest = %path.display(), "loading exercise");
            found.push(Exercise::from_json_file(&path).await?);
        }
    }
    found.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(found)
}

/// Built-in exercises merged with manifests from the configured directory;
/// a manifest replaces a built-in with the same id.
pub async fn all() -> Result<Vec<Exercise>> {
    let mut exercises = builtin();
    if let Some(dir) = config::exercises_dir() {
        for exercise in discover(&dir).await? {
            match exercises.iter_mut().find(|e| e.id == exercise.id) {
                Some(slot) => *slot = exercise,
                None => exercises.push(exercise),
            }
        }
    }
    Ok(exercises)
}

/// Finds an exercise by id, or loads it directly when `id_or_path` names a
/// manifest file.
pub async fn find(id_or_path: &str) -> Result<Exercise> {
    let path = Path::new(id_or_path);
    if tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
    {
        return Exercise::from_json_file(path).await;
    }

    let exercises = all().await?;
    match exercises.into_iter().find(|e| e.id == id_or_path) {
        Some(exercise) => Ok(exercise),
        None => bail!("Unknown exercise `{id_or_path}`"),
    }
}
