//! Subprocess-backed [`ExternalTool`].
//!
//! A `ProcessTool` runs one program with fixed leading arguments and a hard
//! timeout. On timeout the child is killed and the call fails; it never blocks
//! past the deadline.

use folio_traits::{ExternalTool, ToolError, ToolInput, ToolOutput};
use log::{debug, trace};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct ProcessTool {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

impl ProcessTool {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout,
        }
    }

    /// Arguments placed before the per-call arguments on every invocation.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn io_error(&self, e: impl ToString) -> ToolError {
        ToolError::Io {
            program: self.program.clone(),
            message: e.to_string(),
        }
    }

    fn spawn(&self, input: &ToolInput) -> Result<Child, ToolError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(&input.args)
            .stdin(if input.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &input.working_dir {
            command.current_dir(dir);
        }
        command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::NotFound(self.program.clone())
            } else {
                self.io_error(e)
            }
        })
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = source {
            let _ = reader.read_to_end(&mut buf);
        }
        buf
    })
}

impl ExternalTool for ProcessTool {
    fn name(&self) -> &str {
        &self.program
    }

    fn invoke(&self, input: ToolInput) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();
        debug!(
            "Running '{}' with {} argument(s), timeout {:?}",
            self.program,
            self.base_args.len() + input.args.len(),
            self.timeout
        );
        let mut child = self.spawn(&input)?;

        let stdin_writer = match (child.stdin.take(), input.stdin) {
            (Some(mut pipe), Some(bytes)) => Some(thread::spawn(move || pipe.write_all(&bytes))),
            _ => None,
        };
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let status = loop {
            match child.try_wait().map_err(|e| self.io_error(e))? {
                Some(status) => break status,
                None if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::Timeout {
                        program: self.program.clone(),
                        timeout: self.timeout,
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        if let Some(writer) = stdin_writer {
            // A child that exits without reading stdin closes the pipe; that is not our failure.
            let _ = writer.join();
        }
        let stdout = stdout_reader.join().map_err(|_| self.io_error("stdout reader panicked"))?;
        let stderr = stderr_reader.join().map_err(|_| self.io_error("stderr reader panicked"))?;
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        trace!("'{}' finished in {:?} with {}", self.program, started.elapsed(), status);

        if !status.success() {
            return Err(ToolError::Failed {
                program: self.program.clone(),
                code: status.code(),
                stderr,
            });
        }
        Ok(ToolOutput { stdout, stderr })
    }
}
