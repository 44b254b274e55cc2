//! Plan computation and display for `crmsync diff`

use colored::{ColoredString, Colorize};
use crmkit::backend::memory::MemoryBackend;
use crmkit::controller::execute;
use crmkit::diff::DiffSummary;
use crmkit::{
    AttributeDelta, Backend, Decision, ForeignObjectPolicy, Namespace, Plan, Reconciler,
    ResourceSpec,
};

use crate::config::PrimitiveDecl;

/// What the declared actions of one primitive would do
pub struct PlanEntry {
    pub name: String,
    pub spec: ResourceSpec,
    /// One plan per action that would run, in order
    pub plans: Vec<Plan>,
    /// Refusal or failure that would end the sequence
    pub error: Option<String>,
}

impl PlanEntry {
    fn is_noop(&self) -> bool {
        self.error.is_none() && self.plans.iter().all(Plan::is_noop)
    }
}

/// Plan every declared action without touching the cluster.
///
/// Each plan is replayed on an in-memory copy of the primitive so later
/// actions see what earlier ones would have done.
pub fn compute_plans(
    backend: &dyn Backend,
    decls: &[&PrimitiveDecl],
    policy: ForeignObjectPolicy,
) -> Vec<PlanEntry> {
    decls
        .iter()
        .map(|decl| plan_declaration(backend, decl, policy))
        .collect()
}

fn plan_declaration(
    backend: &dyn Backend,
    decl: &PrimitiveDecl,
    policy: ForeignObjectPolicy,
) -> PlanEntry {
    let mut entry = PlanEntry {
        name: decl.name.clone(),
        spec: decl.to_spec(),
        plans: Vec::new(),
        error: None,
    };

    let snapshot = match MemoryBackend::snapshot_of(backend, &decl.name) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            entry.error = Some(e.to_string());
            return entry;
        }
    };
    let reconciler = Reconciler::new(&snapshot).with_policy(policy);

    for action in &decl.action {
        let planned = reconciler
            .load(&decl.name)
            .and_then(|pass| match action.lifecycle() {
                None => pass.plan_create(&entry.spec),
                Some(lifecycle) => pass.plan_lifecycle(lifecycle),
            });

        let plan = match planned {
            Ok(plan) => plan,
            Err(e) => {
                entry.error = Some(e.to_string());
                break;
            }
        };

        let result = execute(&snapshot, &plan);
        entry.plans.push(plan);
        if let Some(failure) = result.failure {
            entry.error = Some(failure);
            break;
        }
    }

    entry
}

fn symbol(delta: &AttributeDelta) -> ColoredString {
    match delta {
        AttributeDelta::Add { .. } => "+".green(),
        AttributeDelta::Change { .. } => "~".yellow(),
        AttributeDelta::Remove { .. } => "-".red(),
    }
}

fn describe(delta: &AttributeDelta) -> String {
    let keyword = delta.namespace().keyword();
    match delta {
        AttributeDelta::Add { key, value, .. } => format!("{keyword} {key} = {value}"),
        AttributeDelta::Change { key, from, to, .. } => {
            format!("{keyword} {key}: {} → {to}", from.dimmed())
        }
        AttributeDelta::Remove { key, .. } => format!("{keyword} {key}"),
    }
}

/// Print one plan; returns its attribute counts
fn display_plan(plan: &Plan, spec: &ResourceSpec) -> DiffSummary {
    match plan.decision {
        Decision::Create => {
            println!("│   {} create {}", "+".green(), spec.agent.dimmed());
            let mut summary = DiffSummary::default();
            for ns in Namespace::ALL {
                for (key, value) in spec.attributes(ns) {
                    println!("│       {} {} {key} = {value}", "+".green(), ns.keyword());
                    summary.additions += 1;
                }
            }
            summary
        }
        Decision::Modify => {
            println!("│   {} modify", "~".yellow());
            for delta in &plan.deltas {
                println!("│       {} {}", symbol(delta), describe(delta));
            }
            DiffSummary::from_deltas(&plan.deltas)
        }
        Decision::Start => {
            println!("│   {} start", "~".yellow());
            DiffSummary::default()
        }
        Decision::Stop => {
            println!("│   {} stop", "~".yellow());
            DiffSummary::default()
        }
        Decision::Delete => {
            println!("│   {} delete", "-".red());
            DiffSummary::default()
        }
        Decision::NoOp => DiffSummary::default(),
    }
}

/// Display planned changes in a user-friendly format
pub fn display_plans(entries: &[PlanEntry]) -> DiffSummary {
    let mut summary = DiffSummary::default();
    let mut lifecycle = 0;
    let pending: Vec<&PlanEntry> = entries.iter().filter(|e| !e.is_noop()).collect();

    if pending.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return summary;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Primitive Diff".bold()
    );
    println!("│");

    for entry in pending {
        println!("│ {}", entry.name.bold());
        for plan in entry.plans.iter().filter(|p| !p.is_noop()) {
            let counts = display_plan(plan, &entry.spec);
            summary.additions += counts.additions;
            summary.changes += counts.changes;
            summary.removals += counts.removals;
            if matches!(
                plan.decision,
                Decision::Start | Decision::Stop | Decision::Delete
            ) {
                lifecycle += 1;
            }
        }
        if let Some(error) = &entry.error {
            println!("│   {} {}", "✗".red(), error.red());
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} added, {} changed, {} removed), {} lifecycle steps",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.changes.to_string().yellow(),
        summary.removals.to_string().red(),
        lifecycle.to_string().bold()
    );
    println!("└─────────────────────────────────────────────────────┘");

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Action;

    fn decl(name: &str, agent: &str, action: Vec<Action>) -> PrimitiveDecl {
        PrimitiveDecl {
            name: name.into(),
            agent: agent.into(),
            action,
            params: [("ip".to_string(), "10.0.0.2".to_string())].into(),
            meta: Default::default(),
            op: Vec::new(),
        }
    }

    fn vip() -> PrimitiveDecl {
        decl("vip", "ocf:heartbeat:IPaddr2", vec![Action::Create])
    }

    fn decisions(entry: &PlanEntry) -> Vec<Decision> {
        entry.plans.iter().map(|p| p.decision).collect()
    }

    #[test]
    fn test_plans_do_not_apply() {
        let backend = MemoryBackend::with_primitive(
            ResourceSpec::new("vip", "ocf:heartbeat:IPaddr2").with_param("ip", "10.0.0.1"),
        );
        let d = vip();

        let entries = compute_plans(&backend, &[&d], ForeignObjectPolicy::default());

        assert_eq!(decisions(&entries[0]), vec![Decision::Modify]);
        assert!(backend.applied().is_empty());
        assert_eq!(backend.primitive("vip").unwrap().params["ip"], "10.0.0.1");

        let summary = display_plans(&entries);
        assert_eq!(summary.changes, 1);
    }

    #[test]
    fn test_delete_only_declaration_plans_delete() {
        let backend = MemoryBackend::with_primitive(ResourceSpec::new("old-web", "ocf:heartbeat:apache"));
        let d = decl("old-web", "ocf:heartbeat:apache", vec![Action::Delete]);

        let entries = compute_plans(&backend, &[&d], ForeignObjectPolicy::default());

        assert_eq!(decisions(&entries[0]), vec![Decision::Delete]);
        assert_eq!(entries[0].plans[0].commands, vec!["crm configure delete old-web"]);
        assert!(backend.primitive("old-web").is_some());

        let summary = display_plans(&entries);
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_stop_on_absent_primitive_is_refused() {
        let backend = MemoryBackend::new();
        let d = decl("old-web", "ocf:heartbeat:apache", vec![Action::Stop, Action::Delete]);

        let entries = compute_plans(&backend, &[&d], ForeignObjectPolicy::default());

        assert!(entries[0].plans.is_empty());
        assert!(entries[0].error.as_deref().unwrap().contains("non-existent"));
    }

    #[test]
    fn test_stop_then_delete_of_running_primitive() {
        let backend = MemoryBackend::with_primitive(ResourceSpec::new("old-web", "ocf:heartbeat:apache"));
        backend.set_running("old-web", true);
        let d = decl("old-web", "ocf:heartbeat:apache", vec![Action::Stop, Action::Delete]);

        let entries = compute_plans(&backend, &[&d], ForeignObjectPolicy::default());

        assert_eq!(decisions(&entries[0]), vec![Decision::Stop, Decision::Delete]);
        assert!(entries[0].error.is_none());
        assert!(backend.is_running("old-web").unwrap());
        assert!(backend.applied().is_empty());
    }

    #[test]
    fn test_delete_of_absent_primitive_is_noop() {
        let backend = MemoryBackend::new();
        let d = decl("old-web", "ocf:heartbeat:apache", vec![Action::Delete]);

        let entries = compute_plans(&backend, &[&d], ForeignObjectPolicy::default());

        assert_eq!(decisions(&entries[0]), vec![Decision::NoOp]);
        assert!(entries[0].is_noop());
    }

    #[test]
    fn test_create_then_start_sees_the_create() {
        let backend = MemoryBackend::new();
        let d = decl("vip", "ocf:heartbeat:IPaddr2", vec![Action::Create, Action::Start]);

        let entries = compute_plans(&backend, &[&d], ForeignObjectPolicy::default());

        assert_eq!(decisions(&entries[0]), vec![Decision::Create, Decision::Start]);
        assert!(entries[0].error.is_none());
        assert!(backend.query("vip").unwrap().is_none());
    }

    #[test]
    fn test_agent_mismatch_is_listed() {
        let backend = MemoryBackend::with_primitive(ResourceSpec::new("vip", "ocf:heartbeat:apache"));
        let d = vip();

        let entries = compute_plans(&backend, &[&d], ForeignObjectPolicy::default());

        assert!(entries[0].plans.is_empty());
        assert!(entries[0].error.as_deref().unwrap().contains("ocf:heartbeat:apache"));
    }

    #[test]
    fn test_describe_change() {
        colored::control::set_override(false);
        let delta = AttributeDelta::Change {
            namespace: Namespace::Meta,
            key: "target-role".into(),
            from: "Stopped".into(),
            to: "Started".into(),
        };
        assert_eq!(describe(&delta), "meta target-role: Stopped → Started");
    }
}
