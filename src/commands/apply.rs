//! Declarative commands: `apply` and `diff`

use anyhow::{Result, bail};
use crmkit::backend::default_backend;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::CrmsyncConfig;
use crate::engine::differ::{compute_plans, display_plans};
use crate::engine::executor::{ExecuteSummary, print_outcomes};
use crate::engine::{ExecuteOptions, execute};
use crate::ui;

/// Make the cluster match the declarations
pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let config = CrmsyncConfig::load(ctx.config.as_deref())?;
    let decls = config.select(args.name.as_deref())?;

    if decls.is_empty() {
        ui::warn("No primitives declared");
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs.unwrap_or(config.jobs),
        policy: ctx.policy(&config),
    };

    if !ctx.quiet && !args.json {
        ui::header(&format!(
            "Reconciling {} primitive(s) with {} job(s)",
            decls.len(),
            opts.jobs
        ));
    }

    let backend = default_backend();
    let outcomes = execute(&backend, &decls, &opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        print_outcomes(&outcomes);
    }

    let summary = ExecuteSummary::from_outcomes(&outcomes);
    if !summary.is_success() {
        bail!("{} primitive(s) failed", summary.failed);
    }
    Ok(())
}

/// Preview what `apply` would do, action by action
pub fn diff(ctx: &Context, target: Option<&str>) -> Result<()> {
    let config = CrmsyncConfig::load(ctx.config.as_deref())?;
    let decls = config.select(target)?;

    let backend = default_backend();
    let entries = compute_plans(&backend, &decls, ctx.policy(&config));
    let summary = display_plans(&entries);

    if ctx.verbose > 0 {
        ui::dim(&format!("{} attribute change(s) pending", summary.total()));
    }
    Ok(())
}
