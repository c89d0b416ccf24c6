//! Per-call handler context
//!
//! A [`HandlerContext`] is created fresh for every reconciliation call and
//! discarded once the result is reported. It carries the two disjoint
//! tracks a handler can report on: fatal failure (`failed` + `fault`) and
//! non-fatal drift (`changes`).

use crate::diff::{ChangeSet, ChangeValue};
use crate::types::ApplyResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity of a diagnostic recorded during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for log::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Error => log::Level::Error,
        }
    }
}

/// A message attached to a reconciliation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Mutable state shared between the driver and a handler for one call
#[derive(Debug)]
pub struct HandlerContext {
    /// Identifier of the task driving this call (e.g. `VirtualMachine.web01`)
    pub task_id: String,
    /// The resource exists on the remote host
    pub deployed: bool,
    /// A fatal error stopped the reconciliation
    pub failed: bool,
    /// Differences detected by `read`, consumed by `update`
    pub changes: ChangeSet,
    /// Parsed observed state kept for display or reuse
    pub extras: BTreeMap<String, serde_json::Value>,
    pub diagnostics: Vec<Diagnostic>,
    /// The error that set `failed`, if it came from a handler
    pub fault: Option<anyhow::Error>,
}

impl HandlerContext {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            deployed: false,
            failed: false,
            changes: ChangeSet::new(),
            extras: BTreeMap::new(),
            diagnostics: Vec::new(),
            fault: None,
        }
    }

    /// Record a change under `name`
    pub fn add_change(&mut self, name: impl Into<String>, value: impl Into<ChangeValue>) {
        let name = name.into();
        let value = value.into();
        log::debug!("[{}] change {} -> {}", self.task_id, name, value);
        self.changes.insert(name, value);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(Level::Debug, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Level::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into());
    }

    /// Mark the call as failed with the given fault
    pub fn fail(&mut self, fault: anyhow::Error) {
        self.error(format!("{:#}", fault));
        self.failed = true;
        self.deployed = false;
        self.fault = Some(fault);
    }

    /// Diagnostics at or above `level`
    pub fn messages(&self, level: Level) -> impl Iterator<Item = &str> {
        self.diagnostics
            .iter()
            .filter(move |d| d.level >= level)
            .map(|d| d.message.as_str())
    }

    fn push(&mut self, level: Level, message: String) {
        log::log!(log::Level::from(level), "[{}] {}", self.task_id, message);
        self.diagnostics.push(Diagnostic { level, message });
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called when starting to reconcile a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource reconciliation completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult, ctx: &HandlerContext);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult, _ctx: &HandlerContext) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_sets_flag_and_keeps_fault() {
        let mut ctx = HandlerContext::new("VMSwitch.LAN");
        ctx.deployed = true;
        ctx.fail(anyhow::anyhow!("transport down"));

        assert!(ctx.failed);
        assert!(!ctx.deployed);
        assert!(ctx.fault.is_some());
        assert_eq!(ctx.messages(Level::Error).next(), Some("transport down"));
    }

    #[test]
    fn test_failure_does_not_touch_changes() {
        let mut ctx = HandlerContext::new("VirtualMachine.web01");
        ctx.add_change("ProcessorCount", 4u64);
        ctx.fail(anyhow::anyhow!("boom"));

        assert_eq!(ctx.changes.len(), 1);
    }

    #[test]
    fn test_messages_filters_by_level() {
        let mut ctx = HandlerContext::new("t");
        ctx.debug("quiet");
        ctx.warn("loud");

        let warnings: Vec<&str> = ctx.messages(Level::Warn).collect();
        assert_eq!(warnings, ["loud"]);
        assert_eq!(ctx.messages(Level::Debug).count(), 2);
    }
}
