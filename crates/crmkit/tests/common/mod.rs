//! Shared helpers for reconciliation contract tests.

#![allow(dead_code)]

use crmkit::backend::memory::MemoryBackend;
use crmkit::{Backend, Operation, ResourceSpec, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A floating IP primitive with one parameter of each kind.
pub fn vip_spec() -> ResourceSpec {
    ResourceSpec::new("vip", "ocf:heartbeat:IPaddr2")
        .with_param("ip", "10.0.0.10")
        .with_param("cidr_netmask", "24")
        .with_meta("target-role", "Started")
        .with_op(Operation::new("monitor").with("interval", "10s"))
}

/// Backend that accepts every command but never stores anything.
///
/// Simulates a cluster tool that exits 0 without committing the change.
#[derive(Default)]
pub struct SwallowingBackend {
    applied: AtomicUsize,
}

impl SwallowingBackend {
    pub fn applied_count(&self) -> usize {
        self.applied.load(Ordering::SeqCst)
    }
}

impl Backend for SwallowingBackend {
    fn query(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn apply(&self, _command: &str) -> Result<()> {
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }
}

/// An in-memory cluster with `vip_spec()` already configured.
pub fn cluster_with_vip() -> MemoryBackend {
    MemoryBackend::with_primitive(vip_spec())
}
