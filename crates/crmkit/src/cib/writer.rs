//! Writer for primitive definitions in the crm shell layout.
//!
//! Produces the same text `crm configure show <name>` prints, so rendered
//! definitions can be fed back through the parser.

use crate::types::{Attributes, ResourceSpec};
use std::fmt::Write;

/// Render a primitive definition.
pub fn render(spec: &ResourceSpec) -> String {
    let mut output = format!("primitive {} {}", spec.name, spec.agent);

    if !spec.params.is_empty() {
        let _ = write!(output, " \\\n\tparams{}", pairs(&spec.params));
    }
    if !spec.meta.is_empty() {
        let _ = write!(output, " \\\n\tmeta{}", pairs(&spec.meta));
    }
    for op in &spec.operations {
        let _ = write!(output, " \\\n\top {}{}", op.action, pairs(&op.attributes));
    }

    output
}

/// Render ` key="value"` for every entry.
pub(crate) fn pairs(attributes: &Attributes) -> String {
    let mut output = String::new();
    for (key, value) in attributes {
        let _ = write!(output, " {key}=\"{value}\"");
    }
    output
}
