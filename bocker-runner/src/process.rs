//! External tool invocation
//!
//! Every collaborator shells out through [`ToolRunner`], which:
//! - maps a missing binary to `ToolNotFound`
//! - maps a non-zero exit to `ToolExecutionFailed` with combined output
//! - records each command line in the action log

use bocker_core::{Error, Result};
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use tracing::debug;

use crate::service::ActionLog;

/// Runs external binaries and captures their output
#[derive(Clone)]
pub struct ToolRunner {
    log: Arc<dyn ActionLog>,
}

impl ToolRunner {
    pub fn new(log: Arc<dyn ActionLog>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Arc<dyn ActionLog> {
        &self.log
    }

    /// Runs `program` with `args` and returns its stdout
    pub fn run(&self, program: &str, args: &[String]) -> Result<String> {
        self.log.info(command_line(program, args));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| spawn_error(program, e))?;

        finish(program, output)
    }

    /// Runs `program` feeding `input` on stdin
    ///
    /// The input is not recorded in the action log.
    pub fn run_with_stdin(&self, program: &str, args: &[String], input: &str) -> Result<String> {
        self.log.info(command_line(program, args));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        finish(program, output)
    }

    /// Checks that `program --version` succeeds and returns the version text
    pub fn check_available(&self, program: &str) -> Result<String> {
        let output = Command::new(program)
            .arg("--version")
            .output()
            .map_err(|e| spawn_error(program, e))?;

        finish(program, output)
    }
}

fn command_line(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        format!("Running: {}", program)
    } else {
        format!("Running: {} {}", program, args.join(" "))
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::ToolNotFound {
            tool: program.to_string(),
        }
    } else {
        Error::Io(e)
    }
}

fn finish(program: &str, output: Output) -> Result<String> {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !stdout.trim().is_empty() {
        debug!("{} stdout: {}", program, stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", program, stderr.trim());
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let diagnostics = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(Error::tool_failed(program, code, diagnostics));
    }

    Ok(stdout)
}
