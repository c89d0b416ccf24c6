//! # pwshkit
//!
//! Build PowerShell command lines and scripts as data, and run them on a
//! local or remote host.
//!
//! ## Example
//!
//! ```no_run
//! use pwshkit::{Command, Executor, Target, default_backend};
//!
//! let exec = default_backend();
//! let target = Target::new("hv01").with_user("admin");
//!
//! let query = Command::new("Get-VMSwitch").arg("Name", "LAN").to_json();
//! let output = exec.run(&target, &query).expect("host unreachable");
//! println!("{}", output.text());
//! ```
//!
//! ## Backends
//!
//! - `process` (default): runs `powershell` locally, or through `ssh` for
//!   remote hosts
//! - [`MockExecutor`]: canned replies and call recording for tests

#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Executor trait and its implementations.
pub mod backend;
/// Structured command lines.
pub mod command;
/// Error types for command execution.
pub mod error;
/// Multi-line scripts.
pub mod script;
/// Targets and command output.
pub mod types;

pub use backend::Executor;
pub use backend::mock::{Call, CallKind, MockExecutor};
#[cfg(feature = "process")]
pub use backend::{default_backend, process::ProcessExecutor};
pub use command::{Command, bool_literal, quote};
pub use error::{Error, Result};
pub use script::{Interpreter, STOP_ON_ERROR, Script};
pub use types::{Output, Target};
