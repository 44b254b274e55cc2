//! Single-primitive commands: `show`, `start`, `stop` and `delete`

use anyhow::{Result, bail};
use crmkit::backend::default_backend;
use crmkit::{LifecycleAction, Namespace, Reconciler};

use crate::Context;
use crate::ui;

/// Print the parsed live state of a primitive
pub fn show(ctx: &Context, name: &str) -> Result<()> {
    let backend = default_backend();
    let reconciler = Reconciler::new(&backend).with_policy(ctx.flag_policy());

    let pass = match reconciler.load(name) {
        Ok(pass) => pass,
        Err(e) => {
            ui::report(name, &e);
            bail!("could not load primitive '{name}'");
        }
    };

    let Some(live) = pass.into_live() else {
        ui::info(&format!("Primitive '{name}' is not configured"));
        return Ok(());
    };

    ui::header(&live.name);
    ui::kv("agent", &live.agent);
    for ns in Namespace::ALL {
        for (key, value) in live.attributes(ns) {
            ui::kv(&format!("{} {key}", ns.keyword()), value);
        }
    }
    for op in &live.operations {
        let attrs: Vec<String> = op
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        ui::kv(&format!("op {}", op.action), &attrs.join(" "));
    }

    if ctx.verbose > 0 {
        println!();
        ui::dim(&live.definition);
    }
    Ok(())
}

/// Run one lifecycle action against a primitive
pub fn lifecycle(ctx: &Context, name: &str, action: LifecycleAction) -> Result<()> {
    let backend = default_backend();
    let reconciler = Reconciler::new(&backend).with_policy(ctx.flag_policy());

    let result = match action {
        LifecycleAction::Start => reconciler.ensure_started(name),
        LifecycleAction::Stop => reconciler.ensure_stopped(name),
        LifecycleAction::Delete => reconciler.ensure_deleted(name),
    };

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            ui::report(name, &e);
            bail!("could not {action} primitive '{name}'");
        }
    };

    if let Some(failure) = &result.failure {
        ui::error(&format!("{name}: {failure}"));
        bail!("could not {action} primitive '{name}'");
    }

    if result.changed {
        if !ctx.quiet {
            ui::success(&format!("{name}: {action} done"));
        }
    } else if !ctx.quiet {
        ui::dim(&format!("{name}: nothing to {action}"));
    }
    Ok(())
}
