//! # Declarative
//!
//! A framework for declarative resource reconciliation.
//!
//! This crate provides the core abstractions for declaring desired state,
//! reading observed state, recording the differences, and converging a
//! system to match the desired state.
//!
//! ## Core Concepts
//!
//! - **Resource**: An immutable description of something that should exist
//! - **Handler**: Per-kind logic: `read` → `create` / `update`
//! - **HandlerContext**: Call-local state: deployed/failed flags, change set,
//!   diagnostics
//! - **ChangeSet**: Ordered, named differences between desired and observed
//!   state
//! - **reconcile / execute**: Drive the cycle for one or many resources
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Handler, HandlerContext, ReconcileOptions, Resource, reconcile};
//!
//! #[derive(Debug)]
//! struct Dir { path: String }
//!
//! impl Resource for Dir {
//!     fn id(&self) -> String { self.path.clone() }
//!     fn resource_type(&self) -> &'static str { "dir" }
//! }
//!
//! struct DirHandler;
//!
//! impl Handler<Dir> for DirHandler {
//!     fn resource_type(&self) -> &'static str { "dir" }
//!
//!     fn read(&self, dir: &Dir, ctx: &mut HandlerContext) -> anyhow::Result<()> {
//!         ctx.deployed = std::path::Path::new(&dir.path).is_dir();
//!         Ok(())
//!     }
//!
//!     fn create(&self, dir: &Dir, ctx: &mut HandlerContext) -> anyhow::Result<()> {
//!         std::fs::create_dir_all(&dir.path)?;
//!         ctx.deployed = true;
//!         Ok(())
//!     }
//! }
//!
//! let dir = Dir { path: "/tmp/example".into() };
//! let mut ctx = HandlerContext::new(dir.task_id());
//! let result = reconcile(&DirHandler, &dir, &mut ctx, &ReconcileOptions::default());
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, Diagnostic, HandlerContext, Level, NoProgress,
    ProgressCallback,
};
pub use diff::{ChangeSet, ChangeValue};
pub use executor::{execute, reconcile};
pub use planner::filter_by_target;
pub use resource::{Handler, Resource};
pub use types::{ApplyResult, ExecuteSummary, ReconcileOptions};
