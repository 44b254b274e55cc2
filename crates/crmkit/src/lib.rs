//! # crmkit
//!
//! Converge Pacemaker resource primitives to a declared configuration.
//!
//! This crate provides functionality for:
//! - Parsing `crm configure show` definitions into a structured live state
//! - Diffing declared parameters and meta-attributes against the live ones
//! - Rendering `crm` / `crm_resource` commands for creation, updates and
//!   lifecycle changes
//! - Running a reconciliation pass that applies those commands in order
//!
//! ## Example
//!
//! ```no_run
//! use crmkit::{Reconciler, ResourceSpec, backend::crm::CrmBackend};
//!
//! let backend = CrmBackend::new();
//! let reconciler = Reconciler::new(&backend);
//!
//! let vip = ResourceSpec::new("vip", "ocf:heartbeat:IPaddr2")
//!     .with_param("ip", "10.0.0.10")
//!     .with_meta("target-role", "Started");
//!
//! let result = reconciler.ensure_created(&vip)?;
//! if result.changed {
//!     println!("applied {} command(s)", result.commands_applied.len());
//! }
//! # Ok::<(), crmkit::Error>(())
//! ```
//!
//! ## Passes
//!
//! Every pass queries the cluster afresh. Commands are applied one at a
//! time and the pass stops at the first failing command, reporting what was
//! already applied. Running the pass again only applies what is still
//! missing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cib;
pub mod command;
pub mod controller;
pub mod diff;
pub mod error;
pub mod types;

pub use backend::Backend;
pub use controller::{Decision, ForeignObjectPolicy, LoadedPass, Plan, Reconciler};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AttributeDelta, Attributes, LifecycleAction, LiveState, Namespace, Operation,
    ReconcileResult, ResourceSpec,
};
