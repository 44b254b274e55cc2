//! Reconciliation of one primitive against the live cluster.
//!
//! A pass has two explicit steps. [`Reconciler::load`] queries and parses
//! the live definition into a [`LoadedPass`]; one of the `plan_*` or
//! `ensure_*` methods then consumes the pass. Nothing is cached between
//! passes, so a failed pass can simply be run again.

use crate::backend::Backend;
use crate::cib::parser::{self, Definition};
use crate::command;
use crate::diff;
use crate::error::{Error, Result};
use crate::types::{AttributeDelta, LifecycleAction, LiveState, ReconcileResult, ResourceSpec};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

/// How to treat a same-named object that is not a primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForeignObjectPolicy {
    /// Behave as if nothing with that name existed
    #[default]
    TreatAsAbsent,
    /// Fail with [`Error::NotPrimitive`]
    Reject,
}

/// What a pass decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Primitive is absent and will be configured
    Create,
    /// Primitive exists and attributes will be updated
    Modify,
    /// Primitive will be started
    Start,
    /// Primitive will be stopped
    Stop,
    /// Primitive will be removed from the CIB
    Delete,
    /// Live state already matches
    NoOp,
}

/// The commands a pass would apply, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Primitive name
    pub name: String,
    /// Chosen transition
    pub decision: Decision,
    /// Attribute deltas behind a `Modify` decision
    pub deltas: Vec<AttributeDelta>,
    /// Rendered commands
    pub commands: Vec<String>,
}

impl Plan {
    fn new(name: &str, decision: Decision, commands: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            decision,
            deltas: Vec::new(),
            commands,
        }
    }

    fn noop(name: &str) -> Self {
        Self::new(name, Decision::NoOp, Vec::new())
    }

    /// Check if the plan has nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Entry point for reconciliation passes.
pub struct Reconciler<'a> {
    backend: &'a dyn Backend,
    policy: ForeignObjectPolicy,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over a backend.
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            policy: ForeignObjectPolicy::default(),
        }
    }

    /// Set the policy for same-named non-primitive objects.
    pub fn with_policy(mut self, policy: ForeignObjectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Query and parse the live definition of `name`.
    pub fn load(&self, name: &str) -> Result<LoadedPass<'a>> {
        let live = match self.backend.query(name)? {
            Some(text) => match parser::parse_definition(name, &text)? {
                Some(Definition::Primitive(state)) => Some(state),
                Some(Definition::Foreign { kind }) => match self.policy {
                    ForeignObjectPolicy::TreatAsAbsent => {
                        warn!("Resource '{name}' was not a primitive (found {kind})");
                        None
                    }
                    ForeignObjectPolicy::Reject => {
                        return Err(Error::NotPrimitive {
                            name: name.to_string(),
                            kind,
                        });
                    }
                },
                None => None,
            },
            None => None,
        };

        Ok(LoadedPass {
            backend: self.backend,
            name: name.to_string(),
            live,
        })
    }

    /// Load and make sure `spec` is configured.
    pub fn ensure_created(&self, spec: &ResourceSpec) -> Result<ReconcileResult> {
        self.load(&spec.name)?.ensure_created(spec)
    }

    /// Load and make sure `name` is not configured.
    pub fn ensure_deleted(&self, name: &str) -> Result<ReconcileResult> {
        self.load(name)?.ensure_deleted()
    }

    /// Load and make sure `name` is running.
    pub fn ensure_started(&self, name: &str) -> Result<ReconcileResult> {
        self.load(name)?.ensure_started()
    }

    /// Load and make sure `name` is stopped.
    pub fn ensure_stopped(&self, name: &str) -> Result<ReconcileResult> {
        self.load(name)?.ensure_stopped()
    }
}

/// A pass holding one fresh snapshot of the live state.
pub struct LoadedPass<'a> {
    backend: &'a dyn Backend,
    name: String,
    live: Option<LiveState>,
}

impl LoadedPass<'_> {
    /// The live primitive, or `None` when it does not exist.
    pub fn live(&self) -> Option<&LiveState> {
        self.live.as_ref()
    }

    /// Consume the pass and keep the snapshot.
    pub fn into_live(self) -> Option<LiveState> {
        self.live
    }

    /// Decide how to make the cluster match `spec`.
    pub fn plan_create(&self, spec: &ResourceSpec) -> Result<Plan> {
        if spec.name != self.name {
            return Err(Error::InvalidSpec(format!(
                "pass loaded for '{}' cannot reconcile '{}'",
                self.name, spec.name
            )));
        }
        command::validate_spec(spec)?;

        let Some(live) = &self.live else {
            info!("Creating new resource primitive {}", self.name);
            return Ok(Plan::new(
                &self.name,
                Decision::Create,
                vec![command::build_create(spec)?],
            ));
        };

        if live.agent != spec.agent {
            return Err(Error::AgentMismatch {
                name: self.name.clone(),
                current: live.agent.clone(),
                desired: spec.agent.clone(),
            });
        }

        info!(
            "Checking existing resource primitive {} for modifications",
            self.name
        );
        let deltas = diff::diff_resource(spec, live);
        if deltas.is_empty() {
            return Ok(Plan::noop(&self.name));
        }

        let commands = deltas
            .iter()
            .map(|delta| command::build_delta(&self.name, delta))
            .collect::<Result<Vec<_>>>()?;

        Ok(Plan {
            deltas,
            ..Plan::new(&self.name, Decision::Modify, commands)
        })
    }

    /// Decide how to apply a lifecycle action.
    pub fn plan_lifecycle(&self, action: LifecycleAction) -> Result<Plan> {
        let name = self.name.as_str();

        if self.live.is_none() {
            return match action {
                LifecycleAction::Delete => Ok(Plan::noop(name)),
                _ => Err(Error::NotFound {
                    name: name.to_string(),
                    action: action.verb().to_string(),
                }),
            };
        }

        let running = self.backend.is_running(name)?;
        let decision = match (action, running) {
            (LifecycleAction::Delete, true) => {
                return Err(Error::ResourceBusy {
                    name: name.to_string(),
                });
            }
            (LifecycleAction::Delete, false) => Decision::Delete,
            (LifecycleAction::Start, false) => Decision::Start,
            (LifecycleAction::Stop, true) => Decision::Stop,
            (LifecycleAction::Start, true) | (LifecycleAction::Stop, false) => {
                return Ok(Plan::noop(name));
            }
        };

        Ok(Plan::new(
            name,
            decision,
            vec![command::build_lifecycle(name, action)?],
        ))
    }

    /// Create or modify the primitive to match `spec`.
    ///
    /// The agent of an existing primitive is never changed.
    pub fn ensure_created(self, spec: &ResourceSpec) -> Result<ReconcileResult> {
        let plan = self.plan_create(spec)?;
        let mut result = execute(self.backend, &plan);

        if plan.decision == Decision::Create && result.is_success() {
            match self.backend.query(&self.name) {
                Ok(Some(_)) => info!("Successfully configured primitive '{}'.", self.name),
                Ok(None) => {
                    error!("Failed to configure primitive {}.", self.name);
                    result.changed = false;
                    result.failure = Some(format!(
                        "primitive '{}' configured but not present in the CIB",
                        self.name
                    ));
                }
                Err(e) => {
                    error!("Could not verify primitive {}: {e}", self.name);
                    result.changed = false;
                    result.failure = Some(e.to_string());
                }
            }
        }

        Ok(result)
    }

    /// Delete the primitive unless it is running.
    pub fn ensure_deleted(self) -> Result<ReconcileResult> {
        self.run_lifecycle(LifecycleAction::Delete)
    }

    /// Start the primitive if it is not running.
    pub fn ensure_started(self) -> Result<ReconcileResult> {
        self.run_lifecycle(LifecycleAction::Start)
    }

    /// Stop the primitive if it is running.
    pub fn ensure_stopped(self) -> Result<ReconcileResult> {
        self.run_lifecycle(LifecycleAction::Stop)
    }

    fn run_lifecycle(self, action: LifecycleAction) -> Result<ReconcileResult> {
        let plan = self.plan_lifecycle(action)?;
        let result = execute(self.backend, &plan);
        if result.changed {
            let done = match action {
                LifecycleAction::Start => "started",
                LifecycleAction::Stop => "stopped",
                LifecycleAction::Delete => "deleted",
            };
            info!("Successfully {done} primitive '{}'.", self.name);
        }
        Ok(result)
    }
}

/// Apply a plan's commands in order, stopping at the first failure.
pub fn execute(backend: &dyn Backend, plan: &Plan) -> ReconcileResult {
    let mut result = ReconcileResult::unchanged(&plan.name);

    for command in &plan.commands {
        info!("{}: {command}", plan.name);
        match backend.apply(command) {
            Ok(()) => result.commands_applied.push(command.clone()),
            Err(e) => {
                error!("{}: {e}", plan.name);
                result.failure = Some(e.to_string());
                break;
            }
        }
    }

    result.changed = !result.commands_applied.is_empty();
    result
}
