//! Resource and handler traits for declarative state management
//!
//! A [`Resource`] is an immutable description of desired state. A
//! [`Handler`] knows how to read the observed state of one kind of
//! resource, record differences, and issue the commands that converge it.

use crate::context::HandlerContext;
use anyhow::Result;
use std::fmt;

/// Identity of a declared resource
pub trait Resource: Send + Sync + fmt::Debug {
    /// Natural key of this resource within its type
    ///
    /// Examples:
    /// - "LAN" for a virtual switch
    /// - "C:\VMs\web01.vhdx" for a virtual disk
    fn id(&self) -> String;

    /// Resource type category (e.g., "ExternalSwitch", "VirtualMachine")
    fn resource_type(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> String {
        format!("{} {}", self.resource_type(), self.id())
    }

    /// Task identifier used to tag diagnostics and remote objects
    fn task_id(&self) -> String {
        format!("{}.{}", self.resource_type(), self.id())
    }
}

/// CRUD handler for one kind of resource
///
/// Handlers must keep no state between calls: everything observed during
/// a call lives in the [`HandlerContext`], which makes concurrent
/// reconciliation of independent resources safe.
///
/// # Contract
///
/// - `read` sets `ctx.deployed` when the resource exists and records any
///   drift with [`HandlerContext::add_change`]. An absent resource is not
///   an error.
/// - `create` converges an absent resource and sets `ctx.deployed`.
/// - `update` consumes `ctx.changes` and sets `ctx.deployed`.
///
/// Returning `Err` is fatal for the call; the driver marks the context as
/// failed and stops.
pub trait Handler<R: ?Sized>: Send + Sync {
    /// Resource type this handler is registered for
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of the resource
    fn read(&self, resource: &R, ctx: &mut HandlerContext) -> Result<()>;

    /// Create the resource from its description
    fn create(&self, resource: &R, ctx: &mut HandlerContext) -> Result<()>;

    /// Apply the change set recorded by `read`
    ///
    /// Resources without configurable attributes never produce changes,
    /// so the default does nothing beyond confirming deployment.
    fn update(&self, _resource: &R, ctx: &mut HandlerContext) -> Result<()> {
        ctx.deployed = true;
        Ok(())
    }
}
