use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "crmsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge Pacemaker primitives to a declared configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Declarations file (default: ~/.config/crmsync/primitives.toml)
    #[arg(short, long, global = true, env = "CRMSYNC_CONFIG")]
    pub config: Option<String>,

    /// Fail when a same-named object is not a primitive
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the declared actions for every primitive (or one)
    Apply(ApplyArgs),

    /// Preview what apply would do without touching the cluster
    Diff(TargetArgs),

    /// Show the live definition of a primitive
    Show(NameArgs),

    /// Start a configured primitive
    Start(NameArgs),

    /// Stop a running primitive
    Stop(NameArgs),

    /// Remove a stopped primitive from the CIB
    Delete(NameArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Only this primitive
    pub name: Option<String>,

    /// Simulate the passes without changing the cluster
    #[arg(long)]
    pub dry_run: bool,

    /// Number of primitives reconciled in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Only this primitive
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct NameArgs {
    /// Primitive name
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::parse_from(["crmsync", "-vv", "apply", "vip", "--dry-run", "-j", "2"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.name.as_deref(), Some("vip"));
                assert!(args.dry_run);
                assert_eq!(args.jobs, Some(2));
                assert!(!args.json);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["crmsync", "delete", "vip", "--strict", "--config", "/tmp/p.toml"]);
        assert!(cli.strict);
        assert_eq!(cli.config.as_deref(), Some("/tmp/p.toml"));
        assert!(matches!(cli.command, Command::Delete(NameArgs { ref name }) if name == "vip"));
    }
}
