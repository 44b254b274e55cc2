mod cli;
mod commands;
mod config;
mod engine;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use crmkit::{ForeignObjectPolicy, LifecycleAction};
use std::io;

use crate::config::CrmsyncConfig;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<String>,
    pub strict: bool,
}

impl Context {
    /// Policy from `--strict` alone, for commands that read no declarations
    pub fn flag_policy(&self) -> ForeignObjectPolicy {
        if self.strict {
            ForeignObjectPolicy::Reject
        } else {
            ForeignObjectPolicy::TreatAsAbsent
        }
    }

    /// `--strict` wins over the declarations file
    pub fn policy(&self, config: &CrmsyncConfig) -> ForeignObjectPolicy {
        if self.strict {
            ForeignObjectPolicy::Reject
        } else {
            config.policy()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        strict: cli.strict,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::apply(&ctx, &args),
        Command::Diff(args) => commands::apply::diff(&ctx, args.name.as_deref()),
        Command::Show(args) => commands::resource::show(&ctx, &args.name),
        Command::Start(args) => {
            commands::resource::lifecycle(&ctx, &args.name, LifecycleAction::Start)
        }
        Command::Stop(args) => {
            commands::resource::lifecycle(&ctx, &args.name, LifecycleAction::Stop)
        }
        Command::Delete(args) => {
            commands::resource::lifecycle(&ctx, &args.name, LifecycleAction::Delete)
        }
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "crmsync", &mut io::stdout());
            Ok(())
        }
    }
}
