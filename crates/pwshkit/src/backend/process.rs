//! Process backend implementation.
//!
//! Runs PowerShell as a child process. Local targets start the interpreter
//! directly; remote targets go through the system `ssh` client, which is
//! expected to have key-based access already configured. The command or
//! script body is always written to the interpreter's stdin so no quoting
//! survives a second shell.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::script::Interpreter;
use crate::types::{Output, Target};

use super::Executor;

/// ssh exits with 255 when the connection itself failed
const SSH_CONNECTION_FAILED: i32 = 255;

/// Backend implementation using child processes.
pub struct ProcessExecutor {
    /// PowerShell executable name on the target
    powershell: String,
    /// ssh client used for remote targets
    ssh: String,
}

impl ProcessExecutor {
    /// Create a new ProcessExecutor using `powershell` and `ssh` from PATH.
    pub fn new() -> Self {
        Self {
            powershell: "powershell".to_string(),
            ssh: "ssh".to_string(),
        }
    }

    /// Use a different PowerShell executable (e.g. `pwsh`).
    pub fn with_powershell(mut self, program: impl Into<String>) -> Self {
        self.powershell = program.into();
        self
    }

    /// Use a different ssh client.
    pub fn with_ssh(mut self, program: impl Into<String>) -> Self {
        self.ssh = program.into();
        self
    }

    /// Interpreter command line that reads its program from stdin
    fn interpreter_args(&self, interpreter: Interpreter) -> (String, Vec<String>) {
        match interpreter {
            Interpreter::PowerShell => (
                self.powershell.clone(),
                vec![
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    "-".to_string(),
                ],
            ),
            Interpreter::Cmd => ("cmd".to_string(), vec!["/Q".to_string()]),
        }
    }

    /// Build the process for a target: the interpreter itself, or ssh
    /// running the interpreter on the remote side.
    fn build(&self, target: &Target, interpreter: Interpreter) -> (String, Command) {
        let (program, args) = self.interpreter_args(interpreter);

        if target.is_local() {
            let mut cmd = Command::new(&program);
            cmd.args(&args);
            return (program, cmd);
        }

        let mut cmd = Command::new(&self.ssh);
        cmd.args(["-o", "BatchMode=yes"]);
        if let Some(port) = target.port {
            cmd.args(["-p", &port.to_string()]);
        }
        cmd.arg(target.destination());
        cmd.arg(program);
        cmd.args(&args);
        (self.ssh.clone(), cmd)
    }

    /// Spawn, feed `input` on stdin, and collect output.
    fn run_with_input(
        &self,
        target: &Target,
        interpreter: Interpreter,
        input: &str,
    ) -> Result<Output> {
        let (program, mut cmd) = self.build(target, interpreter);

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::InterpreterNotFound(program.clone())
                } else {
                    Error::Spawn {
                        program: program.clone(),
                        source: e,
                    }
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
            if !input.ends_with('\n') {
                stdin.write_all(b"\n")?;
            }
        }

        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !target.is_local() && output.status.code() == Some(SSH_CONNECTION_FAILED) {
            return Err(Error::Unreachable {
                host: target.host.clone(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(Output {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, target: &Target, command: &str) -> Result<Output> {
        self.run_with_input(target, Interpreter::PowerShell, command)
    }

    fn script(&self, target: &Target, script: &str, interpreter: Interpreter) -> Result<()> {
        let output = self.run_with_input(target, interpreter, script)?;
        if output.success {
            Ok(())
        } else {
            Err(Error::ScriptFailed {
                host: target.host.clone(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}
