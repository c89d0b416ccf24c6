//! Backend abstraction for running commands on a host.
//!
//! The [`Executor`] trait is the only way the rest of the workspace talks
//! to a hypervisor host, enabling:
//! - Real execution via a local `powershell` or `ssh`
//! - A scripted mock for testing

pub mod mock;
#[cfg(feature = "process")]
pub mod process;

use crate::command::Command;
use crate::error::Result;
use crate::script::{Interpreter, Script};
use crate::types::{Output, Target};

/// Executor trait for host commands.
///
/// Implementations must be safe to share between threads; they are the
/// only shared collaborator of otherwise call-local reconciliation work.
/// Timeouts and authentication are the implementation's business.
pub trait Executor: Send + Sync {
    /// Run one command line and return what it printed.
    ///
    /// A command that runs but reports an error still returns `Ok`; only a
    /// failure of the channel itself is an `Err`.
    fn execute(&self, target: &Target, command: &str) -> Result<Output>;

    /// Run a multi-line script. No structured result is expected.
    fn script(&self, target: &Target, script: &str, interpreter: Interpreter) -> Result<()>;

    /// Run a structured command
    fn run(&self, target: &Target, command: &Command) -> Result<Output> {
        let line = command.to_string();
        log::debug!("[{}] {}", target, line);
        self.execute(target, &line)
    }

    /// Run a structured script
    fn run_script(&self, target: &Target, script: &Script) -> Result<()> {
        let body = script.to_string();
        log::debug!("[{}] script ({} lines)", target, script.len());
        log::trace!("{}", body);
        self.script(target, &body, Interpreter::PowerShell)
    }
}

/// Get the default backend (local `powershell`, or `ssh` for remote hosts).
#[cfg(feature = "process")]
pub fn default_backend() -> process::ProcessExecutor {
    process::ProcessExecutor::new()
}
