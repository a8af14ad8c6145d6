//! Tests for executing submissions in a child interpreter.

use std::{fs, path::PathBuf, time::Duration};

use hydrae::{BindingKind, CallOutcome, ExecuteError, Execution, Probe, Submission};
use serde_json::json;
use uuid::Uuid;

fn fixture(name: &str) -> Submission {
    Submission::at(
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join("python")
            .join(name)
            .join("main.py"),
    )
}

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("hydrae-exec-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

#[tokio::test]
async fn captures_stdout_and_namespace() {
    let capture = fixture("chatty-add")
        .execute()
        .await
        .expect("execute");

    assert_eq!(capture.stdout(), "");
    let ns = capture.namespace();
    assert_eq!(ns.get("add").map(|b| b.kind()), Some(BindingKind::Function));
    assert!(ns.get("add").is_some_and(|b| b.is_callable()));
    assert_eq!(
        ns.get("values").and_then(|b| b.value()),
        Some(&json!([1, 2.5, "three", null]))
    );
    assert_eq!(ns.get("__name__").and_then(|b| b.value()), Some(&json!("__main__")));
    assert!(!ns.contains("__builtins__"));
    let user: Vec<&str> = ns.user_names().collect();
    assert_eq!(user, vec!["add", "divide", "values"]);
}

#[tokio::test]
async fn probe_output_is_kept_separate() {
    let capture = Execution::builder()
        .submission(fixture("chatty-add"))
        .probes([
            Probe::new("add", [json!(1), json!(2)]),
            Probe::new("divide", [json!(1), json!(0)]),
        ])
        .build()
        .run()
        .await
        .expect("execute");

    assert_eq!(capture.stdout(), "");
    match &capture.call("add", &[json!(1), json!(2)]).expect("add probe").outcome {
        CallOutcome::Returned { value, stdout, .. } => {
            assert_eq!(value, &Some(json!(3)));
            assert_eq!(stdout, "adding 1 2\n");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    match &capture.call("divide", &[json!(1), json!(0)]).expect("divide probe").outcome {
        CallOutcome::Raised { exception, .. } => assert_eq!(exception, "ZeroDivisionError"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn stderr_is_captured_separately() {
    let capture = fixture("stderr").execute().await.expect("execute");
    assert_eq!(capture.stdout(), "to stdout\n");
    assert_eq!(capture.stderr(), "to stderr\n");
}

#[tokio::test]
async fn stdin_is_delivered() {
    let capture = Execution::builder()
        .submission(fixture("echo-stdin"))
        .stdin("Ada\n")
        .build()
        .run()
        .await
        .expect("execute");

    assert_eq!(capture.stdout(), "hello Ada\n");
}

#[tokio::test]
async fn closed_stdin_makes_input_raise() {
    let err = fixture("echo-stdin").execute().await.expect_err("EOF");
    assert!(matches!(err, ExecuteError::Raised { ref exception, .. } if exception == "EOFError"));
}

#[tokio::test]
async fn syntax_error_propagates() {
    let err = fixture("syntax-error").execute().await.expect_err("syntax");
    match err {
        ExecuteError::Syntax { file_name, message } => {
            assert_eq!(file_name, "main.py");
            assert!(message.contains("SyntaxError"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn runtime_error_propagates_with_partial_output() {
    let err = fixture("runtime-error").execute().await.expect_err("raised");
    match err {
        ExecuteError::Raised {
            exception,
            traceback,
            stdout,
            ..
        } => {
            assert_eq!(exception, "ValueError");
            assert!(traceback.contains("boom"));
            assert_eq!(stdout, "before the crash\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_submission_is_an_error() {
    let root = temp_root();
    let err = Submission::at(root.join("main.py"))
        .execute()
        .await
        .expect_err("missing");
    assert!(matches!(err, ExecuteError::MissingSubmission { .. }));
    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn runaway_submission_is_killed() {
    let err = Execution::builder()
        .submission(fixture("infinite-loop"))
        .timeout(Duration::from_secs(1))
        .build()
        .run()
        .await
        .expect_err("timeout");

    assert!(matches!(err, ExecuteError::TimedOut { timeout } if timeout == Duration::from_secs(1)));
}

#[tokio::test]
async fn successful_exit_keeps_namespace() {
    let capture = fixture("exit-zero").execute().await.expect("execute");
    assert_eq!(capture.stdout(), "done\n");
    assert!(capture.namespace().contains("add"));
}

#[tokio::test]
async fn failing_exit_is_an_error() {
    let err = fixture("exit-fail").execute().await.expect_err("exit");
    match err {
        ExecuteError::Exited { code, stdout, .. } => {
            assert_eq!(code, "3");
            assert_eq!(stdout, "giving up\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sibling_modules_are_importable() {
    let capture = fixture("local-import").execute().await.expect("execute");
    assert_eq!(capture.stdout(), "HYDRAE!\n");
}

#[tokio::test]
async fn execution_leaves_no_bytecode_behind() {
    let root = temp_root();
    fs::write(root.join("helper.py"), "VALUE = 41\n").expect("write helper");
    fs::write(root.join("main.py"), "from helper import VALUE\nprint(VALUE + 1)\n")
        .expect("write main");

    let capture = Submission::at(root.join("main.py"))
        .execute()
        .await
        .expect("execute");

    assert_eq!(capture.stdout(), "42\n");
    assert!(!root.join("__pycache__").exists());
    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn repeated_executions_are_identical() {
    let first = fixture("main-guard").execute().await.expect("first");
    let second = fixture("main-guard").execute().await.expect("second");

    assert_eq!(first.stdout(), second.stdout());
    let first_names: Vec<&str> = first.namespace().names().collect();
    let second_names: Vec<&str> = second.namespace().names().collect();
    assert_eq!(first_names, second_names);
}

#[tokio::test]
async fn integers_beyond_64_bits_keep_only_their_repr() {
    let capture = Execution::builder()
        .submission(fixture("big-int"))
        .probes([Probe::new("huge", Vec::new())])
        .build()
        .run()
        .await
        .expect("execute");

    assert_eq!(capture.stdout(), "Hydrae computed a big number\n");
    let big = capture.namespace().get("big").expect("big is bound");
    assert_eq!(big.value(), None);
    assert!(big.repr().starts_with("788657867364790503552363213932185062295135977687173263294742"));
    assert_eq!(big.repr().len(), 375);
    assert_eq!(
        capture.namespace().get("small").and_then(|b| b.value()),
        Some(&json!(1_099_511_627_776_u64))
    );

    match &capture.call("huge", &[]).expect("huge call").outcome {
        CallOutcome::Returned { value, type_name, .. } => {
            assert_eq!(type_name, "int");
            assert_eq!(value, &None);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn exit_hooks_cannot_replace_the_capture() {
    let capture = fixture("forged-report").execute().await.expect("execute");

    assert_eq!(capture.stdout(), "Hydrae is honest\n");
    assert!(capture.namespace().contains("add"));
}

#[cfg(unix)]
#[tokio::test]
async fn background_processes_do_not_turn_a_run_into_a_timeout() {
    let started = std::time::Instant::now();
    let capture = Execution::builder()
        .submission(fixture("background-helper"))
        .timeout(Duration::from_secs(5))
        .build()
        .run()
        .await
        .expect("finished run is not a timeout");

    assert_eq!(capture.stdout(), "Hydrae started a helper\n");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn lone_surrogates_in_output_are_replaced() {
    let capture = fixture("surrogate").execute().await.expect("execute");

    assert_eq!(capture.stdout(), "hydrae \u{fffd}\n");
    assert_eq!(
        capture.namespace().get("pair").and_then(|b| b.value()),
        Some(&json!("\u{1f600}"))
    );
}

#[tokio::test]
async fn boolean_results_match_integer_expectations() {
    let capture = Execution::builder()
        .submission(fixture("bool-result"))
        .probes([Probe::new("is_one", [json!(1)])])
        .build()
        .run()
        .await
        .expect("execute");

    let outcome = hydrae::grade::assertions::call_result(&capture, "is_one", &[json!(1)], &json!(1));
    assert!(outcome.passed(), "{}", outcome.message());
}
