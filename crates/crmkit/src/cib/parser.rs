//! Parser for `crm configure show <name>` output.
//!
//! Handles the crm shell layout of a primitive definition:
//! ```text
//! primitive vip ocf:heartbeat:IPaddr2 \
//!     params ip="10.0.0.10" cidr_netmask=24 \
//!     meta target-role=Started \
//!     op monitor interval=10s timeout=20s
//! ```

use crate::error::{Error, Result};
use crate::types::{Attributes, LiveState, Operation};
use log::{debug, warn};

/// A definition returned by the CIB for a queried name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// The object is a primitive
    Primitive(LiveState),
    /// The object exists but is another kind (group, clone, ms, ...)
    Foreign { kind: String },
}

/// Clause currently being read.
enum Clause {
    Header,
    Params,
    Meta,
    Op(usize),
    Ignored,
}

/// Parse a definition, treating a non-primitive object as absent.
///
/// Returns `Ok(None)` when the text is empty (the object does not exist)
/// or when it describes another kind of object.
pub fn parse(name: &str, raw: &str) -> Result<Option<LiveState>> {
    match parse_definition(name, raw)? {
        Some(Definition::Primitive(state)) => Ok(Some(state)),
        Some(Definition::Foreign { kind }) => {
            warn!("Resource '{name}' was not a primitive (found {kind})");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Parse a definition, keeping foreign objects distinguishable.
pub fn parse_definition(name: &str, raw: &str) -> Result<Option<Definition>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    debug!("CIB object definition {raw}");

    let tokens = shlex::split(&join_continuations(raw))
        .ok_or_else(|| Error::parse(name, "unbalanced quotes"))?;
    let mut tokens = tokens.into_iter();

    let kind = tokens
        .next()
        .ok_or_else(|| Error::parse(name, "empty definition"))?;
    if kind != "primitive" {
        return Ok(Some(Definition::Foreign { kind }));
    }

    match tokens.next() {
        Some(id) if id == name => {}
        Some(id) => {
            return Err(Error::parse(
                name,
                format!("definition is for '{id}' instead"),
            ));
        }
        None => return Err(Error::parse(name, "missing primitive id")),
    }

    let agent = match tokens.next() {
        Some(agent) if !agent.contains('=') && !is_keyword(&agent) => agent,
        _ => return Err(Error::parse(name, "missing agent")),
    };

    let mut params = Attributes::new();
    let mut meta = Attributes::new();
    let mut operations: Vec<Operation> = Vec::new();
    let mut clause = Clause::Header;

    while let Some(token) = tokens.next() {
        match token.as_str() {
            "params" => clause = Clause::Params,
            "meta" => clause = Clause::Meta,
            // op sub-clauses are kept in the definition text only
            "utilization" | "operations" | "op_params" | "op_meta" => clause = Clause::Ignored,
            "op" => {
                let action = tokens
                    .next()
                    .filter(|a| !a.contains('=') && !is_keyword(a))
                    .ok_or_else(|| Error::parse(name, "op without an action"))?;
                operations.push(Operation::new(action));
                clause = Clause::Op(operations.len() - 1);
            }
            _ => {
                let (key, value) = split_pair(&token)
                    .ok_or_else(|| Error::parse(name, format!("unexpected token '{token}'")))?;
                // nvpair ids and references are not attributes
                if key.starts_with('$') || key.starts_with('@') {
                    continue;
                }
                match clause {
                    Clause::Header if key == "description" => {}
                    Clause::Header => {
                        return Err(Error::parse(
                            name,
                            format!("attribute '{key}' outside of a clause"),
                        ));
                    }
                    Clause::Params => {
                        params.insert(key.to_string(), value.to_string());
                    }
                    Clause::Meta => {
                        meta.insert(key.to_string(), value.to_string());
                    }
                    Clause::Op(idx) => {
                        operations[idx]
                            .attributes
                            .insert(key.to_string(), value.to_string());
                    }
                    Clause::Ignored => {}
                }
            }
        }
    }

    debug!("detected {name} has params {params:?}");
    debug!("detected {name} has meta {meta:?}");

    Ok(Some(Definition::Primitive(LiveState {
        name: name.to_string(),
        definition: raw.to_string(),
        agent,
        params,
        meta,
        operations,
    })))
}

/// Fold `\`-terminated lines into one logical line.
fn join_continuations(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let line = line.trim_end();
            line.strip_suffix('\\').unwrap_or(line).trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split `key=value`; the key must be non-empty.
fn split_pair(token: &str) -> Option<(&str, &str)> {
    token.split_once('=').filter(|(key, _)| !key.is_empty())
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "params" | "meta" | "op" | "op_params" | "op_meta" | "utilization" | "operations"
    )
}
