//! # hyperv
//!
//! Reconcile Hyper-V hosts, virtual switches, virtual hard disks and
//! virtual machines against a declared state.
//!
//! Every resource kind has a [`Handler`](declarative::Handler) that reads
//! the observed state through a [`pwshkit::Executor`], records drift in
//! the call's change set, and issues the PowerShell that converges it.
//! [`Provider`] dispatches a [`Resource`] to the right handler.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use declarative::{HandlerContext, ReconcileOptions, Resource as _, reconcile};
//! use hyperv::{HostResource, Provider, Resource, SwitchResource};
//! use pwshkit::{Target, default_backend};
//!
//! let host = Arc::new(HostResource::new("hv01", Target::new("hv01.lab")));
//! let switch = Resource::Switch(Arc::new(SwitchResource::internal("LAN", host)));
//!
//! let provider = Provider::new(Arc::new(default_backend()));
//! let mut ctx = HandlerContext::new(switch.task_id());
//! let result = reconcile(&provider, &switch, &mut ctx, &ReconcileOptions::default());
//! println!("{:?}", result);
//! ```

pub mod diagnostics;
pub mod disk;
pub mod error;
pub mod host;
pub mod machine;
pub mod model;
pub mod observed;
pub mod provider;
mod session;
pub mod switch;
pub mod units;

pub use disk::DiskHandler;
pub use error::{Error, Result};
pub use host::HostHandler;
pub use machine::{MachineHandler, SecureBootCheck};
pub use model::{
    BootDevice, DiskResource, DiskType, ExternalSettings, HostResource, MachineResource,
    OsFamily, OsFingerprint, Resource, StartAction, StopAction, SwitchKind, SwitchResource,
    SwitchType,
};
pub use provider::Provider;
pub use switch::SwitchHandler;
pub use units::{format_size, parse_size};
