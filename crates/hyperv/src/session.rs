//! Commands bound to one host.

use pwshkit::{Command, Executor, Output, Script, Target};
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::observed;

/// An executor paired with the target every command goes to
pub(crate) struct Session<'a> {
    exec: &'a dyn Executor,
    target: &'a Target,
}

impl<'a> Session<'a> {
    pub fn new(exec: &'a dyn Executor, target: &'a Target) -> Self {
        Self { exec, target }
    }

    /// Run a command and return its output whatever it reports
    pub fn query(&self, command: &Command) -> Result<Output> {
        Ok(self.exec.run(self.target, command)?)
    }

    /// Run a command that must succeed
    pub fn check(&self, command: &Command) -> Result<Output> {
        let output = self.query(command)?;
        self.ensure_success(output)
    }

    /// Run a query and parse its JSON output
    pub fn json<T: DeserializeOwned>(&self, what: &'static str, command: &Command) -> Result<T> {
        let output = self.check(command)?;
        observed::parse(what, output.text())
    }

    /// Run a query that may return zero, one or many records
    pub fn list<T: DeserializeOwned>(
        &self,
        what: &'static str,
        command: &Command,
    ) -> Result<Vec<T>> {
        let output = self.check(command)?;
        observed::parse_list(what, output.text())
    }

    /// Run a property query and return its trimmed text
    pub fn text(&self, command: &Command) -> Result<String> {
        Ok(self.check(command)?.text().to_string())
    }

    pub fn script(&self, script: &Script) -> Result<()> {
        Ok(self.exec.run_script(self.target, script)?)
    }

    /// Turn error output into a transport fault
    pub fn ensure_success(&self, output: Output) -> Result<Output> {
        if output.success {
            return Ok(output);
        }
        Err(pwshkit::Error::ScriptFailed {
            host: self.target.host.clone(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        }
        .into())
    }
}
