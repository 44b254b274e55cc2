//! Core types for primitive reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute mapping of one namespace (key → value).
///
/// Ordered so that diffs and rendered commands are deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Attribute namespace of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Agent-specific instance attributes (`params`)
    Parameter,
    /// Cluster-level meta-attributes (`meta`)
    Meta,
}

impl Namespace {
    /// Both namespaces, in the order they are reconciled.
    pub const ALL: [Namespace; 2] = [Namespace::Parameter, Namespace::Meta];

    /// The clause keyword used in the CIB grammar.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Parameter => "params",
            Self::Meta => "meta",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::Meta => "meta-attribute",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An operation declared on a primitive (`op monitor interval=10s`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation action (monitor, start, stop, ...)
    pub action: String,
    /// Operation attributes (interval, timeout, ...)
    pub attributes: Attributes,
}

impl Operation {
    /// Create an operation without attributes.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Desired configuration of a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Primitive id in the CIB
    pub name: String,
    /// Resource agent (e.g. `ocf:heartbeat:IPaddr2`)
    pub agent: String,
    /// Instance attributes
    #[serde(default)]
    pub params: Attributes,
    /// Meta-attributes
    #[serde(default)]
    pub meta: Attributes,
    /// Operations; only rendered when the primitive is created
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl ResourceSpec {
    /// Create a spec with empty attribute maps.
    pub fn new(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent: agent.into(),
            params: Attributes::new(),
            meta: Attributes::new(),
            operations: Vec::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a meta-attribute.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Add an operation.
    pub fn with_op(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Attributes of the given namespace.
    pub fn attributes(&self, namespace: Namespace) -> &Attributes {
        match namespace {
            Namespace::Parameter => &self.params,
            Namespace::Meta => &self.meta,
        }
    }
}

/// Snapshot of a primitive as found in the CIB.
///
/// Produced fresh by every reconciliation pass and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveState {
    /// Primitive id
    pub name: String,
    /// Raw definition text as returned by the cluster
    pub definition: String,
    /// Resource agent
    pub agent: String,
    /// Instance attributes
    pub params: Attributes,
    /// Meta-attributes
    pub meta: Attributes,
    /// Operations (informational, never diffed)
    pub operations: Vec<Operation>,
}

impl LiveState {
    /// Attributes of the given namespace.
    pub fn attributes(&self, namespace: Namespace) -> &Attributes {
        match namespace {
            Namespace::Parameter => &self.params,
            Namespace::Meta => &self.meta,
        }
    }
}

/// A single attribute change between live and desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AttributeDelta {
    /// Key is declared but not present
    Add {
        /// Namespace of the key
        namespace: Namespace,
        /// Attribute key
        key: String,
        /// Declared value
        value: String,
    },
    /// Key is present with a different value
    Change {
        /// Namespace of the key
        namespace: Namespace,
        /// Attribute key
        key: String,
        /// Live value
        from: String,
        /// Declared value
        to: String,
    },
    /// Key is present but no longer declared
    Remove {
        /// Namespace of the key
        namespace: Namespace,
        /// Attribute key
        key: String,
    },
}

impl AttributeDelta {
    /// Namespace the delta applies to.
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Add { namespace, .. }
            | Self::Change { namespace, .. }
            | Self::Remove { namespace, .. } => *namespace,
        }
    }

    /// Attribute key the delta applies to.
    pub fn key(&self) -> &str {
        match self {
            Self::Add { key, .. } | Self::Change { key, .. } | Self::Remove { key, .. } => key,
        }
    }

    /// Check if this delta removes the key.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Remove { .. })
    }
}

impl fmt::Display for AttributeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add {
                namespace,
                key,
                value,
            } => write!(f, "add {namespace} {key}={value}"),
            Self::Change {
                namespace,
                key,
                from,
                to,
            } => write!(f, "change {namespace} {key}: {from} -> {to}"),
            Self::Remove { namespace, key } => write!(f, "remove {namespace} {key}"),
        }
    }
}

/// Lifecycle action on an existing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    /// `crm resource start`
    Start,
    /// `crm resource stop`
    Stop,
    /// `crm configure delete`
    Delete,
}

impl LifecycleAction {
    /// Verb used in messages and commands.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    /// Primitive the pass ran against
    pub name: String,
    /// Whether at least one command took effect
    pub changed: bool,
    /// Commands applied successfully, in order
    pub commands_applied: Vec<String>,
    /// Why the pass stopped early, if it did
    pub failure: Option<String>,
}

impl ReconcileResult {
    /// A pass that found nothing to do.
    pub fn unchanged(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Check if the pass ran to completion.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

impl From<LiveState> for ResourceSpec {
    fn from(state: LiveState) -> Self {
        Self {
            name: state.name,
            agent: state.agent,
            params: state.params,
            meta: state.meta,
            operations: state.operations,
        }
    }
}
