//! Multi-line scripts submitted to a host in one round trip.
//!
//! A rendered [`Script`] stops at the first failing command: every line
//! runs inside one script block with `$ErrorActionPreference = 'Stop'`, so
//! a non-terminating cmdlet error aborts the block and the interpreter
//! exits unsuccessfully instead of carrying on with the next line.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::command::Command;

/// First line of every rendered script
pub const STOP_ON_ERROR: &str = "$ErrorActionPreference = 'Stop'";

/// Interpreter a script is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpreter {
    #[default]
    PowerShell,
    Cmd,
}

impl fmt::Display for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpreter::PowerShell => write!(f, "powershell"),
            Interpreter::Cmd => write!(f, "cmd"),
        }
    }
}

/// An ordered list of PowerShell command lines, executed top to bottom
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a structured command
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.lines.push(command.to_string());
        self
    }

    /// Append a pre-rendered line
    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// The command lines, without the error-handling wrapper
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            return Ok(());
        }
        writeln!(f, "{}", STOP_ON_ERROR)?;
        writeln!(f, "& {{")?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        writeln!(f, "}}")?;
        // `-Command -` only runs a multi-line block after an empty line
        writeln!(f)
    }
}

impl From<Command> for Script {
    fn from(command: Command) -> Self {
        let mut script = Script::new();
        script.push(command);
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_renders_lines_in_order() {
        let mut script = Script::new();
        script
            .push(Command::new("Remove-VMNetworkAdapter").arg("VMName", "web01"))
            .push_line("Write-Output done");

        assert_eq!(
            script.lines(),
            ["Remove-VMNetworkAdapter -VMName \"web01\"", "Write-Output done"]
        );
        assert_eq!(
            script.to_string(),
            concat!(
                "$ErrorActionPreference = 'Stop'\n",
                "& {\n",
                "Remove-VMNetworkAdapter -VMName \"web01\"\n",
                "Write-Output done\n",
                "}\n",
                "\n",
            )
        );
    }

    #[test]
    fn test_rendered_script_starts_by_stopping_on_error() {
        let script = Script::from(Command::new("Set-VMMemory").arg("VMName", "web01"));
        let rendered = script.to_string();

        assert_eq!(rendered.lines().next(), Some(STOP_ON_ERROR));
        assert!(rendered.contains("& {\nSet-VMMemory -VMName \"web01\"\n}\n"));
    }

    #[test]
    fn test_empty_script_renders_nothing() {
        assert_eq!(Script::new().to_string(), "");
    }
}
