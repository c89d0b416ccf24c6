//! Scripted executor for tests.
//!
//! Replies are chosen by the first rule whose pattern is a substring of
//! the submitted text. Unmatched commands succeed with empty output.
//! Every call is recorded so tests can assert on exact command text and
//! ordering.

use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::script::Interpreter;
use crate::types::{Output, Target};

use super::Executor;

#[derive(Debug, Clone)]
enum Reply {
    Output(Output),
    Unreachable(String),
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    reply: Reply,
}

/// What kind of call was made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Command,
    Script(Interpreter),
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub target: Target,
    pub kind: CallKind,
    pub text: String,
}

/// In-memory [`Executor`] with canned replies
#[derive(Debug, Default)]
pub struct MockExecutor {
    rules: Vec<Rule>,
    calls: Mutex<Vec<Call>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to any call containing `pattern`
    pub fn on(mut self, pattern: impl Into<String>, output: Output) -> Self {
        self.rules.push(Rule {
            pattern: pattern.into(),
            reply: Reply::Output(output),
        });
        self
    }

    /// Reply with successful `stdout` to any call containing `pattern`
    pub fn on_stdout(self, pattern: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.on(pattern, Output::ok(stdout))
    }

    /// Fail the channel for any call containing `pattern`
    pub fn fail_on(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push(Rule {
            pattern: pattern.into(),
            reply: Reply::Unreachable(message.into()),
        });
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Text of every command (not script) made so far
    pub fn commands(&self) -> Vec<String> {
        self.texts(|kind| kind == CallKind::Command)
    }

    /// Text of every script submitted so far
    pub fn scripts(&self) -> Vec<String> {
        self.texts(|kind| matches!(kind, CallKind::Script(_)))
    }

    /// Number of recorded calls whose text contains `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.text.contains(pattern))
            .count()
    }

    fn texts(&self, keep: impl Fn(CallKind) -> bool) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| keep(call.kind))
            .map(|call| call.text)
            .collect()
    }

    fn record(&self, target: &Target, kind: CallKind, text: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                target: target.clone(),
                kind,
                text: text.to_string(),
            });
        }
    }

    fn reply(&self, target: &Target, text: &str) -> Result<Output> {
        let rule = self.rules.iter().find(|r| text.contains(&r.pattern));
        match rule.map(|r| &r.reply) {
            Some(Reply::Output(output)) => Ok(output.clone()),
            Some(Reply::Unreachable(message)) => Err(Error::Unreachable {
                host: target.host.clone(),
                stderr: message.clone(),
            }),
            None => Ok(Output::ok("")),
        }
    }
}

impl Executor for MockExecutor {
    fn execute(&self, target: &Target, command: &str) -> Result<Output> {
        self.record(target, CallKind::Command, command);
        self.reply(target, command)
    }

    fn script(&self, target: &Target, script: &str, interpreter: Interpreter) -> Result<()> {
        self.record(target, CallKind::Script(interpreter), script);
        let output = self.reply(target, script)?;
        if output.success {
            Ok(())
        } else {
            Err(Error::ScriptFailed {
                host: target.host.clone(),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn test_first_matching_rule_wins() {
        let mock = MockExecutor::new()
            .on_stdout("Get-VMSwitch", "first")
            .on_stdout("Get-VM", "second");
        let target = Target::local();

        let out = mock.execute(&target, "Get-VMSwitch -Name \"LAN\"").unwrap();
        assert_eq!(out.text(), "first");

        let out = mock.execute(&target, "Get-VM -Name \"web01\"").unwrap();
        assert_eq!(out.text(), "second");

        let out = mock.execute(&target, "Get-VHD").unwrap();
        assert_eq!(out, Output::ok(""));
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let mock = MockExecutor::new();
        let target = Target::new("hv01");

        mock.run(&target, &Command::new("Get-VM")).unwrap();
        mock.run_script(&target, &Command::new("New-VM").into())
            .unwrap();

        assert_eq!(mock.commands(), ["Get-VM"]);
        assert_eq!(
            mock.scripts(),
            ["$ErrorActionPreference = 'Stop'\n& {\nNew-VM\n}\n\n"]
        );
        assert_eq!(mock.calls()[1].kind, CallKind::Script(Interpreter::PowerShell));
        assert_eq!(mock.count("VM"), 2);
    }

    #[test]
    fn test_failures() {
        let mock = MockExecutor::new()
            .fail_on("Get-VM", "Connection refused")
            .on("New-VM", Output::err("access denied"));
        let target = Target::new("hv01");

        let err = mock.execute(&target, "Get-VM").unwrap_err();
        assert!(err.is_connection());

        let err = mock
            .script(&target, "New-VM", Interpreter::PowerShell)
            .unwrap_err();
        assert!(matches!(err, Error::ScriptFailed { ref stderr, .. } if stderr == "access denied"));
    }
}
