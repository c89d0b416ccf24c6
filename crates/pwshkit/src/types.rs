//! Common types for command execution

use serde::{Deserialize, Serialize};
use std::fmt;

/// The host a command is sent to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Host name or address; `localhost` runs commands in-process
    pub host: String,
    /// Login user for remote hosts
    #[serde(default)]
    pub user: Option<String>,
    /// ssh port for remote hosts
    #[serde(default)]
    pub port: Option<u16>,
}

impl Target {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: None,
        }
    }

    pub fn local() -> Self {
        Self::new("localhost")
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Returns true if commands run on this machine
    pub fn is_local(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1" | ".")
    }

    /// ssh destination in `user@host` form
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination())
    }
}

/// Output of a command that ran on a host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// Exit code, when the process reported one
    pub code: Option<i32>,
}

impl Output {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Failed output with the given error stream
    pub fn err(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(1),
        }
    }

    /// Returns true if either stream contains `phrase`
    pub fn contains(&self, phrase: &str) -> bool {
        self.stdout.contains(phrase) || self.stderr.contains(phrase)
    }

    /// Trimmed stdout
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_destination() {
        assert_eq!(Target::new("hv01").destination(), "hv01");
        assert_eq!(
            Target::new("hv01").with_user("admin").to_string(),
            "admin@hv01"
        );
        assert!(Target::local().is_local());
        assert!(!Target::new("hv01").is_local());
    }

    #[test]
    fn test_output_contains_checks_both_streams() {
        let out = Output::err("Get-VMSwitch : Hyper-V was unable to find a virtual switch");
        assert!(out.contains("unable to find a virtual switch"));
        assert!(!out.success);
        assert_eq!(Output::ok("  Ethernet \r\n").text(), "Ethernet");
    }
}
