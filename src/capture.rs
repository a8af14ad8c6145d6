#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! What one execution of a submission produced: printed text, top-level
//! bindings, and the results of call probes.

use std::{collections::BTreeMap, time::Duration};

use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    error::ExecuteError,
    python::{REPORT_END, REPORT_START},
};

/// Deserializes a field that is `None` only when absent, so an explicit JSON
/// `null` (Python `None`) becomes `Some(Value::Null)`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Coarse classification of a top-level binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// A function or other non-class callable.
    Function,
    /// A class.
    Class,
    /// An imported module.
    Module,
    /// Anything else.
    Value,
}

/// A single top-level name bound by the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Classification of the bound object.
    kind:      BindingKind,
    /// Python type name, e.g. `int` or `function`.
    type_name: String,
    /// `repr()` of the bound object.
    repr:      String,
    /// Whether the object can be called.
    callable:  bool,
    /// The value itself, when it has a JSON representation.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    value:     Option<Value>,
}

impl Binding {
    /// Creates a binding description without a JSON value.
    pub fn new(kind: BindingKind, type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            repr: repr.into(),
            callable: matches!(kind, BindingKind::Function | BindingKind::Class),
            value: None,
        }
    }

    /// Attaches the JSON form of a plain value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Classification of the bound object.
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// Python type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// `repr()` of the bound object.
    pub fn repr(&self) -> &str {
        &self.repr
    }

    /// Whether the object can be called.
    pub fn is_callable(&self) -> bool {
        self.callable
    }

    /// JSON form of the value, if it has one.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// Top-level names bound by a submission, in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(BTreeMap<String, Binding>);

impl Namespace {
    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Looks up a binding.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.0.get(name)
    }

    /// All bound names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Names that do not start with a double underscore.
    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.names().filter(|name| !name.starts_with("__"))
    }

    /// Iterates over all bindings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.0.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Binding)> for Namespace {
    fn from_iter<T: IntoIterator<Item = (S, Binding)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(name, b)| (name.into(), b)).collect())
    }
}

/// How a call probe ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    /// The callable returned normally.
    Returned {
        /// Python type name of the result.
        type_name: String,
        /// `repr()` of the result.
        repr:      String,
        /// Output printed during the call.
        #[serde(default)]
        stdout:    String,
        /// JSON form of the result, if it has one.
        #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
        value:     Option<Value>,
    },
    /// The callable raised an exception.
    Raised {
        /// Exception class name.
        exception: String,
        /// `str()` of the exception.
        message:   String,
        /// Formatted traceback.
        traceback: String,
        /// Output printed before the exception.
        #[serde(default)]
        stdout:    String,
    },
    /// The name was not bound.
    Missing,
    /// The name was bound to something that cannot be called.
    NotCallable {
        /// Python type name of the bound object.
        type_name: String,
    },
}

/// A call performed after top-level execution, with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Name that was looked up.
    pub name:    String,
    /// Positional arguments passed.
    pub args:    Vec<Value>,
    /// What happened.
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

impl CallRecord {
    /// Whether this record is for `name(*args)`.
    pub fn matches(&self, name: &str, args: &[Value]) -> bool {
        self.name == name && self.args == args
    }
}

/// The result of running a submission once.
#[derive(Debug, Clone, Default, Builder, Serialize)]
#[builder(on(String, into))]
pub struct ExecutionCapture {
    /// Everything printed to stdout, in order.
    #[builder(default)]
    stdout:    String,
    /// Everything printed to stderr, in order.
    #[builder(default)]
    stderr:    String,
    /// Top-level bindings after execution finished.
    #[builder(default)]
    namespace: Namespace,
    /// Call probes requested for this execution.
    #[builder(default)]
    calls:     Vec<CallRecord>,
    /// Wall-clock duration of the child process.
    #[builder(default)]
    elapsed:   Duration,
}

impl ExecutionCapture {
    /// Captured standard output.
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Captured standard error.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Resulting top-level namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// All probe records.
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Finds the probe record for `name(*args)`.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<&CallRecord> {
        self.calls.iter().find(|record| record.matches(name, args))
    }

    /// How long the child process ran.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Status block of the driver report.
#[derive(Debug, Deserialize)]
struct DriverStatus {
    /// Whether top-level execution completed.
    ok:        bool,
    /// `syntax`, `raised` or `exit` when `ok` is false.
    #[serde(default)]
    kind:      Option<String>,
    /// Exception class name.
    #[serde(default)]
    exception: Option<String>,
    /// Exception message.
    #[serde(default)]
    message:   Option<String>,
    /// Formatted traceback.
    #[serde(default)]
    traceback: Option<String>,
    /// `SystemExit` code.
    #[serde(default)]
    exit_code: Option<String>,
}

/// The JSON document the driver writes between the report markers.
#[derive(Debug, Deserialize)]
pub(crate) struct DriverReport {
    /// Whether and how top-level execution finished.
    status:    DriverStatus,
    /// Captured stdout.
    stdout:    String,
    /// Captured stderr.
    stderr:    String,
    /// Bindings, present only when execution completed.
    #[serde(default)]
    namespace: Namespace,
    /// Probe results, present only when execution completed.
    #[serde(default)]
    calls:     Vec<CallRecord>,
}

impl DriverReport {
    /// Decodes the report file the driver wrote. Returns `None` unless the
    /// contents are exactly one marker-framed document, as when the driver
    /// died before finishing the write.
    pub(crate) fn extract(contents: &str) -> Option<Result<Self, ExecuteError>> {
        let body = contents
            .trim()
            .strip_prefix(REPORT_START)?
            .strip_suffix(REPORT_END)?
            .trim();
        Some(serde_json::from_str(body).map_err(ExecuteError::from))
    }

    /// Turns the report into a capture, or into the error that stopped
    /// top-level execution.
    pub(crate) fn into_capture(
        self,
        file_name: &str,
        elapsed: Duration,
    ) -> Result<ExecutionCapture, ExecuteError> {
        let DriverReport {
            status,
            stdout,
            stderr,
            namespace,
            calls,
        } = self;

        if status.ok {
            return Ok(ExecutionCapture {
                stdout,
                stderr,
                namespace,
                calls,
                elapsed,
            });
        }

        let file_name = file_name.to_string();
        match status.kind.as_deref() {
            Some("syntax") => Err(ExecuteError::Syntax {
                file_name,
                message: status.message.unwrap_or_default(),
            }),
            Some("exit") => Err(ExecuteError::Exited {
                file_name,
                code: status.exit_code.unwrap_or_else(|| "1".to_string()),
                stdout,
            }),
            _ => {
                let exception = status.exception.unwrap_or_else(|| "Exception".to_string());
                let traceback = status.traceback.unwrap_or_else(|| {
                    format!("{}: {}", exception, status.message.unwrap_or_default())
                });
                Err(ExecuteError::Raised {
                    file_name,
                    exception,
                    traceback,
                    stdout,
                })
            }
        }
    }
}
