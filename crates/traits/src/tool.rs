//! The external tool seam.
//!
//! Both subprocesses the pipeline depends on (the syntax-tree extractor and
//! the page engine) are reached through [`ExternalTool`], so tests can swap in
//! an [`FnTool`] and never spawn a process.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("External tool '{0}' was not found")]
    NotFound(String),

    #[error("External tool '{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("External tool '{program}' failed (exit code {code:?}): {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error while running '{program}': {message}")]
    Io { program: String, message: String },
}

/// Arguments for one tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolInput {
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub working_dir: Option<PathBuf>,
}

impl ToolInput {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn from_stdout(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// A blocking external capability with a bounded run time.
pub trait ExternalTool: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn invoke(&self, input: ToolInput) -> Result<ToolOutput, ToolError>;
}

/// An [`ExternalTool`] backed by a closure.
pub struct FnTool<F> {
    name: String,
    f: F,
}

impl<F> FnTool<F>
where
    F: Fn(ToolInput) -> Result<ToolOutput, ToolError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}

impl<F> ExternalTool for FnTool<F>
where
    F: Fn(ToolInput) -> Result<ToolOutput, ToolError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, input: ToolInput) -> Result<ToolOutput, ToolError> {
        (self.f)(input)
    }
}
