#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # hydrae
//!
//! Runs a student's Python submission and checks what it prints and defines.
//!
//! - `hydrae run` executes the submission once and prints the capture as JSON.
//! - `hydrae check <EXERCISE>` runs an exercise's checks, each against a
//!   fresh execution.
//! - `hydrae list` shows the known exercises.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use hydrae::{
    Execution, Probe, Submission, config,
    grade::{
        CheckResult, catalog,
        results::{all_passed, render_table},
    },
};
use serde_json::Value;
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Execute the submission and print the capture
    Run {
        /// Submission path override
        submission: Option<PathBuf>,
        /// File whose contents are fed to stdin
        stdin:      Option<PathBuf>,
        /// `NAME:ARGS` call probes
        calls:      Vec<String>,
        /// Timeout override in seconds
        timeout:    Option<u64>,
    },
    /// Run an exercise's checks
    Check {
        /// Exercise id or manifest path
        exercise:   String,
        /// Submission path override
        submission: Option<PathBuf>,
        /// Print results as JSON
        json:       bool,
        /// Print results as a table
        table:      bool,
        /// Timeout override in seconds
        timeout:    Option<u64>,
    },
    /// List known exercises
    List,
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the submission path override
    fn submission() -> impl Parser<Option<PathBuf>> {
        long("submission")
            .short('s')
            .help("Path to the submission (default: /hydrae/main.py or HYDRAE_SUBMISSION)")
            .argument::<PathBuf>("PATH")
            .optional()
    }

    /// parses the timeout override
    fn timeout() -> impl Parser<Option<u64>> {
        long("timeout")
            .help("Wall-clock limit per execution, in seconds")
            .argument::<u64>("SECS")
            .optional()
    }

    let run = {
        let submission = submission();
        let stdin = long("stdin")
            .help("File whose contents are fed to the submission's stdin")
            .argument::<PathBuf>("FILE")
            .optional();
        let calls = long("call")
            .help("Call a function after the run, e.g. --call 'add:[2, 3]'")
            .argument::<String>("NAME:ARGS")
            .many();
        let timeout = timeout();
        construct!(Cmd::Run {
            submission,
            stdin,
            calls,
            timeout
        })
        .to_options()
        .command("run")
        .help("Execute the submission once and print what it printed and defined")
    };

    let check = {
        let submission = submission();
        let json = long("json").help("Print results as JSON").switch();
        let table = long("table").help("Print results as a table").switch();
        let timeout = timeout();
        let exercise = positional::<String>("EXERCISE").help("Exercise id or path to exercise.json");
        construct!(Cmd::Check {
            submission,
            json,
            table,
            timeout,
            exercise
        })
        .to_options()
        .command("check")
        .help("Run an exercise's checks against the submission")
    };

    let list = pure(Cmd::List)
        .to_options()
        .command("list")
        .help("List known exercises");

    let cmd = construct!([run, check, list]);

    cmd.to_options()
        .descr("Grading harness for Python exercises")
        .run()
}

/// Parses a `NAME:ARGS` probe, where `ARGS` is a JSON array.
fn parse_call(call: &str) -> Result<Probe> {
    let (name, args) = call.split_once(':').unwrap_or((call, "[]"));
    let args: Value =
        serde_json::from_str(args).with_context(|| format!("Invalid arguments in `{call}`"))?;
    match args {
        Value::Array(args) => Ok(Probe::new(name.trim(), args)),
        _ => bail!("Arguments in `{call}` must be a JSON array"),
    }
}

/// Installs CLI overrides on top of the environment configuration.
fn apply_overrides(submission: Option<&PathBuf>, timeout: Option<u64>) {
    let mut state = (*config::get()).clone();
    if let Some(path) = submission {
        state = state.with_submission(path);
    }
    if let Some(secs) = timeout.filter(|secs| *secs > 0) {
        state = state.with_timeout(Duration::from_secs(secs));
    }
    config::install(state);
}

/// Prints one colored line per check.
fn print_results(results: &[CheckResult]) {
    for result in results {
        if result.passed() {
            println!("{} {}", "PASS".green().bold(), result.name());
        } else {
            println!("{} {}", "FAIL".red().bold(), result.name());
            for line in result.message().lines() {
                println!("     {line}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match options() {
        Cmd::Run {
            submission,
            stdin,
            calls,
            timeout,
        } => {
            apply_overrides(submission.as_ref(), timeout);
            let probes = calls
                .iter()
                .map(|call| parse_call(call))
                .collect::<Result<Vec<_>>>()?;
            let stdin = match stdin {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Could not read {}", path.display()))?,
                ),
                None => None,
            };

            let capture = Execution::builder()
                .submission(Submission::from_config())
                .probes(probes)
                .maybe_stdin(stdin)
                .build()
                .run()
                .await
                .context("Failed to execute submission")?;
            println!("{}", serde_json::to_string_pretty(&capture)?);
        }
        Cmd::Check {
            exercise,
            submission,
            json,
            table,
            timeout,
        } => {
            apply_overrides(None, timeout);
            let exercise = catalog::find(&exercise).await?;
            let submission = match submission {
                Some(path) => Submission::at(path),
                None => exercise.default_submission(),
            };

            let results = exercise.run(&submission).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if table {
                println!("{}", render_table(&results));
            } else {
                print_results(&results);
            }
            if !all_passed(&results) {
                std::process::exit(1);
            }
        }
        Cmd::List => {
            for exercise in catalog::all().await? {
                println!(
                    "{} {} ({} checks)",
                    exercise.id.bold(),
                    exercise.title,
                    exercise.checks.len()
                );
            }
        }
    };

    Ok(())
}
