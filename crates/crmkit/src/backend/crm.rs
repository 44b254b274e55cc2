//! Real cluster backend using the `crm` shell and `crm_resource`.

use crate::backend::Backend;
use crate::command::CRM;
use crate::error::{Error, Result};
use log::{debug, trace};
use std::process::{Command, Output};

/// Backend that executes real crm commands.
#[derive(Debug, Clone, Default)]
pub struct CrmBackend;

impl CrmBackend {
    /// Create a new CrmBackend.
    pub fn new() -> Self {
        Self
    }

    /// Split a command line and run it.
    fn run(&self, command: &str) -> Result<Output> {
        let parts = shlex::split(command).ok_or_else(|| Error::ExternalCommand {
            command: command.to_string(),
            diagnostic: "cannot split command line".to_string(),
        })?;
        let (program, args) = parts.split_first().ok_or_else(|| Error::ExternalCommand {
            command: command.to_string(),
            diagnostic: "empty command".to_string(),
        })?;

        trace!("running {program} {args:?}");
        Ok(Command::new(program).args(args).output()?)
    }
}

impl Backend for CrmBackend {
    fn query(&self, name: &str) -> Result<Option<String>> {
        let output = self.run(&format!("{CRM} configure show {name}"))?;
        if !output.status.success() {
            debug!(
                "{name} not found in CIB: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_definition_output(
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
        ))
    }

    fn apply(&self, command: &str) -> Result<()> {
        let output = self.run(command)?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(Error::ExternalCommand {
            command: command.to_string(),
            diagnostic,
        })
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        let output = self.run(&format!("{CRM} resource status {name}"))?;
        if !output.status.success() {
            return Ok(false);
        }
        Ok(parse_status(name, &String::from_utf8_lossy(&output.stdout)))
    }
}

/// Definition text from `crm configure show`.
///
/// A failed exit or blank output means the object does not exist.
fn parse_definition_output(success: bool, stdout: &str) -> Option<String> {
    if !success {
        return None;
    }
    let definition = stdout.trim();
    (!definition.is_empty()).then(|| definition.to_string())
}

/// Whether `crm resource status` output reports `name` as running.
///
/// Matches `resource <name> is running` at the start of a line, followed by
/// the end of the line or the node list (`is running on: node1`).
fn parse_status(name: &str, stdout: &str) -> bool {
    let expected = format!("resource {name} is running");
    stdout.lines().any(|line| {
        line.trim()
            .strip_prefix(&expected)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', ':']))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_running_on_node() {
        assert!(parse_status("vip", "resource vip is running on: node1\n"));
        assert!(parse_status("vip", "resource vip is running"));
    }

    #[test]
    fn test_parse_status_not_running() {
        assert!(!parse_status("vip", "resource vip is NOT running\n"));
        assert!(!parse_status("vip", ""));
    }

    #[test]
    fn test_parse_status_name_prefix() {
        assert!(!parse_status("vip", "resource vip2 is running on: node1"));
        assert!(!parse_status("vip", "resource vip-backup is running on: node2"));
        assert!(!parse_status("ip", "resource vip is running on: node1"));
        assert!(parse_status(
            "vip",
            "resource vip-backup is NOT running\nresource vip is running on: node2"
        ));
    }

    #[test]
    fn test_parse_status_other_text_is_ignored() {
        assert!(!parse_status("vip", "resource vip is runningish"));
        assert!(!parse_status("vip", "info: resource vip is running"));
    }

    #[test]
    fn test_parse_definition_output() {
        assert_eq!(parse_definition_output(true, ""), None);
        assert_eq!(parse_definition_output(true, "  \n\t"), None);
        assert_eq!(
            parse_definition_output(true, "primitive vip IPaddr2\n").as_deref(),
            Some("primitive vip IPaddr2")
        );
    }

    #[test]
    fn test_failed_query_is_absent() {
        assert_eq!(
            parse_definition_output(false, "ERROR: object vip does not exist"),
            None
        );
    }
}
