//! Tests for running whole exercises, one fresh execution per check.

use std::path::PathBuf;

use hydrae::{
    Submission,
    grade::{CheckResult, Exercise, catalog},
};

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn fixture(name: &str) -> Submission {
    Submission::at(fixture_root().join("python").join(name).join("main.py"))
}

fn builtin(id: &str) -> Exercise {
    catalog::builtin()
        .into_iter()
        .find(|e| e.id == id)
        .expect("builtin exercise")
}

fn summary(results: &[CheckResult]) -> Vec<(String, bool)> {
    results
        .iter()
        .map(|r| (r.name().to_string(), r.passed()))
        .collect()
}

#[tokio::test]
async fn hello_passes_basics_001() {
    let results = builtin("py.basics.001").run(&fixture("hello")).await;
    assert_eq!(summary(&results), vec![
        ("prints_something".to_string(), true),
        ("mentions_hydrae".to_string(), true),
    ]);
}

#[tokio::test]
async fn checks_are_reported_independently() {
    let results = builtin("py.basics.001").run(&fixture("no-add")).await;
    assert_eq!(summary(&results), vec![
        ("prints_something".to_string(), true),
        ("mentions_hydrae".to_string(), false),
    ]);
    assert_eq!(results[1].message(), "Output should mention 'Hydrae'");
    assert!(results.iter().all(|r| r.exercise() == "py.basics.001"));
}

#[tokio::test]
async fn add_passes_basics_002() {
    let results = builtin("py.basics.002").run(&fixture("add")).await;
    assert_eq!(summary(&results), vec![
        ("add_basic".to_string(), true),
        ("add_negative".to_string(), true),
    ]);
}

#[tokio::test]
async fn missing_add_uses_authored_message() {
    let results = builtin("py.basics.002").run(&fixture("no-add")).await;
    assert!(!results[0].passed());
    assert_eq!(results[0].message(), "Expected function add(a, b) to be defined");
    assert!(!results[1].passed());
    assert_eq!(results[1].message(), "add(-2, 5) should be 3");
}

#[tokio::test]
async fn execution_failure_fails_every_check() {
    let results = builtin("py.basics.002").run(&fixture("syntax-error")).await;
    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(!result.passed());
        assert!(result.message().contains("Syntax error in main.py"));
    }
}

#[tokio::test]
async fn one_exercise_failing_does_not_affect_another() {
    let failing = builtin("py.basics.002").run(&fixture("hello")).await;
    let passing = builtin("py.basics.001").run(&fixture("hello")).await;

    assert!(failing.iter().all(|r| !r.passed()));
    assert!(passing.iter().all(|r| r.passed()));
}

#[tokio::test]
async fn manifest_exercise_runs_with_stdin() {
    let manifest = fixture_root()
        .join("exercises")
        .join("py.custom")
        .join("exercise.json");
    let exercise = Exercise::from_json_file(&manifest)
        .await
        .expect("load manifest");
    assert_eq!(exercise.id, "py.custom");

    let results = exercise.run(&exercise.default_submission()).await;
    assert_eq!(summary(&results), vec![
        ("greets_by_name".to_string(), true),
        ("defines_name".to_string(), true),
    ]);
}

#[tokio::test]
async fn discovery_finds_manifests() {
    let found = catalog::discover(&fixture_root().join("exercises"))
        .await
        .expect("discover");
    let ids: Vec<&str> = found.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["py.custom"]);
}
