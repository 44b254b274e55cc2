//! Runs declared actions across primitives on a thread pool

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use crmkit::backend::memory::MemoryBackend;
use crmkit::{Backend, ForeignObjectPolicy, LifecycleAction, ReconcileResult, Reconciler};
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{Action, PrimitiveDecl};

/// Options for one `apply` run
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Simulate passes against a copy of the live state
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Same-named non-primitive handling
    pub policy: ForeignObjectPolicy,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            policy: ForeignObjectPolicy::default(),
        }
    }
}

/// Everything that happened to one primitive
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub name: String,
    pub dry_run: bool,
    /// One result per action that ran
    pub results: Vec<ReconcileResult>,
    /// Refusal or query error that ended the sequence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub advice: Option<&'static str>,
}

impl Outcome {
    fn new(name: &str, dry_run: bool) -> Self {
        Self {
            name: name.to_string(),
            dry_run,
            results: Vec::new(),
            error: None,
            advice: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.results.iter().all(ReconcileResult::is_success)
    }

    pub fn changed(&self) -> bool {
        self.results.iter().any(|r| r.changed)
    }

    pub fn commands(&self) -> impl Iterator<Item = &String> {
        self.results.iter().flat_map(|r| r.commands_applied.iter())
    }

    /// First failure message, whether refusal or command failure
    pub fn failure(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.results.iter().find_map(|r| r.failure.as_deref()))
    }
}

/// Summary of an `apply` run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub changed: usize,
    pub no_change: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            if !outcome.is_success() {
                summary.failed += 1;
            } else if outcome.changed() {
                summary.changed += 1;
            } else {
                summary.no_change += 1;
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Reconcile every declaration, `opts.jobs` primitives at a time.
///
/// Outcomes come back in declaration order.
pub fn execute(
    backend: &dyn Backend,
    decls: &[&PrimitiveDecl],
    opts: &ExecuteOptions,
) -> Result<Vec<Outcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create apply thread pool")?;

    Ok(pool.install(|| {
        decls
            .par_iter()
            .map(|decl| reconcile_one(backend, decl, opts))
            .collect()
    }))
}

/// Run the declared actions of one primitive in order.
///
/// The sequence stops at the first refusal or failed command.
pub fn reconcile_one(backend: &dyn Backend, decl: &PrimitiveDecl, opts: &ExecuteOptions) -> Outcome {
    let mut outcome = Outcome::new(&decl.name, opts.dry_run);

    let snapshot;
    let target: &dyn Backend = if opts.dry_run {
        match MemoryBackend::snapshot_of(backend, &decl.name) {
            Ok(copy) => {
                snapshot = copy;
                &snapshot
            }
            Err(e) => {
                outcome.advice = Some(e.category().advice());
                outcome.error = Some(e.to_string());
                return outcome;
            }
        }
    } else {
        backend
    };

    let reconciler = Reconciler::new(target).with_policy(opts.policy);
    for action in &decl.action {
        debug!("{}: running {:?}", decl.name, action);
        match run_action(&reconciler, decl, *action) {
            Ok(result) => {
                let failed = !result.is_success();
                outcome.results.push(result);
                if failed {
                    break;
                }
            }
            Err(e) => {
                outcome.advice = Some(e.category().advice());
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }

    outcome
}

fn run_action(
    reconciler: &Reconciler<'_>,
    decl: &PrimitiveDecl,
    action: Action,
) -> crmkit::Result<ReconcileResult> {
    match action.lifecycle() {
        None => reconciler.ensure_created(&decl.to_spec()),
        Some(LifecycleAction::Start) => reconciler.ensure_started(&decl.name),
        Some(LifecycleAction::Stop) => reconciler.ensure_stopped(&decl.name),
        Some(LifecycleAction::Delete) => reconciler.ensure_deleted(&decl.name),
    }
}

/// Print per-primitive lines and the final summary
pub fn print_outcomes(outcomes: &[Outcome]) {
    let dry_run = outcomes.iter().any(|o| o.dry_run);
    let verb = if dry_run { "would run" } else { "ran" };

    for outcome in outcomes {
        let symbol = if !outcome.is_success() {
            "✗".red()
        } else if outcome.changed() {
            "✓".green()
        } else {
            "○".dimmed()
        };
        println!("  {} {}", symbol, outcome.name.bold());

        for command in outcome.commands() {
            println!("      {} {}", verb.dimmed(), command);
        }
        if let Some(failure) = outcome.failure() {
            println!("      {}", failure.red());
            if let Some(advice) = outcome.advice {
                println!("      {}", advice.dimmed());
            }
        }
    }

    print_summary(&ExecuteSummary::from_outcomes(outcomes), dry_run);
}

fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.is_success() {
        println!("  {} Primitives reconciled successfully!", "✓".green().bold());
    } else {
        println!("  {} Primitives reconciled with errors", "⚠".yellow().bold());
    }

    if summary.changed > 0 {
        println!("    • {} primitives changed", summary.changed);
    }
    if summary.no_change > 0 {
        println!("    • {} primitives already converged", summary.no_change);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "primitives".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmkit::ResourceSpec;

    fn decl(name: &str, action: Vec<Action>) -> PrimitiveDecl {
        PrimitiveDecl {
            name: name.to_string(),
            agent: "ocf:pacemaker:Dummy".to_string(),
            action,
            params: [("state".to_string(), format!("/run/{name}"))].into(),
            meta: Default::default(),
            op: Vec::new(),
        }
    }

    fn opts(dry_run: bool) -> ExecuteOptions {
        ExecuteOptions {
            dry_run,
            jobs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_actions_run_in_order() {
        let backend = MemoryBackend::new();
        let d = decl("d1", vec![Action::Create, Action::Start]);

        let outcome = reconcile_one(&backend, &d, &opts(false));

        assert!(outcome.is_success());
        assert_eq!(outcome.results.len(), 2);
        assert!(backend.is_running("d1").unwrap());
    }

    #[test]
    fn test_refusal_stops_sequence() {
        let backend = MemoryBackend::with_primitive(ResourceSpec::new("d1", "ocf:pacemaker:Dummy"));
        backend.set_running("d1", true);
        let d = decl("d1", vec![Action::Delete, Action::Create]);

        let outcome = reconcile_one(&backend, &d, &opts(false));

        assert!(!outcome.is_success());
        assert!(outcome.results.is_empty());
        assert!(outcome.advice.is_some());
        assert!(backend.applied().is_empty());
    }

    #[test]
    fn test_dry_run_leaves_cluster_alone() {
        let backend = MemoryBackend::new();
        let d = decl("d1", vec![Action::Create, Action::Start]);

        let outcome = reconcile_one(&backend, &d, &opts(true));

        assert!(outcome.is_success());
        assert_eq!(outcome.commands().count(), 2);
        assert!(backend.applied().is_empty());
        assert!(backend.query("d1").unwrap().is_none());
    }

    #[test]
    fn test_execute_keeps_declaration_order() {
        let backend = MemoryBackend::new();
        let decls: Vec<PrimitiveDecl> = (0..6)
            .map(|i| decl(&format!("d{i}"), vec![Action::Create]))
            .collect();
        let refs: Vec<&PrimitiveDecl> = decls.iter().collect();

        let outcomes = execute(&backend, &refs, &opts(false)).unwrap();

        let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["d0", "d1", "d2", "d3", "d4", "d5"]);
        assert_eq!(
            ExecuteSummary::from_outcomes(&outcomes),
            ExecuteSummary {
                changed: 6,
                no_change: 0,
                failed: 0
            }
        );

        let again = execute(&backend, &refs, &opts(false)).unwrap();
        assert_eq!(ExecuteSummary::from_outcomes(&again).no_change, 6);
    }

    #[test]
    fn test_outcome_json_skips_advice() {
        let mut outcome = Outcome::new("d1", false);
        outcome.error = Some("boom".into());
        outcome.advice = Some("try again");

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "boom");
        assert!(json.get("advice").is_none());
    }
}
