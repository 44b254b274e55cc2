//! Rendering of cluster commands.
//!
//! Every function here is pure: it turns a declaration or a delta into the
//! exact command line understood by `crm` / `crm_resource`. Text that cannot
//! be embedded safely is rejected before anything is rendered.

use crate::cib::writer::pairs;
use crate::error::{Error, Result};
use crate::types::{AttributeDelta, LifecycleAction, Namespace, ResourceSpec};

/// The crm shell.
pub const CRM: &str = "crm";

/// The low-level resource tool used for attribute updates.
pub const CRM_RESOURCE: &str = "crm_resource";

/// `crm configure primitive ...` for a new primitive.
///
/// Clause order is fixed: params, meta, then operations. Empty clauses are
/// omitted.
pub fn build_create(spec: &ResourceSpec) -> Result<String> {
    validate_spec(spec)?;

    let mut cmd = format!("{CRM} configure primitive {} {}", spec.name, spec.agent);
    for ns in Namespace::ALL {
        let attributes = spec.attributes(ns);
        if !attributes.is_empty() {
            cmd.push(' ');
            cmd.push_str(ns.keyword());
            cmd.push_str(&pairs(attributes));
        }
    }
    for op in &spec.operations {
        cmd.push_str(" op ");
        cmd.push_str(&op.action);
        cmd.push_str(&pairs(&op.attributes));
    }
    Ok(cmd)
}

/// `crm_resource` invocation applying one delta to primitive `name`.
pub fn build_delta(name: &str, delta: &AttributeDelta) -> Result<String> {
    check_name(name)?;
    check_key(delta.key())?;

    let mut cmd = format!("{CRM_RESOURCE} --resource {name}");
    match delta {
        AttributeDelta::Add { key, value, .. } | AttributeDelta::Change { key, to: value, .. } => {
            check_value(key, value)?;
            cmd.push_str(&format!(
                " --set-parameter \"{key}\" --parameter-value \"{value}\""
            ));
        }
        AttributeDelta::Remove { key, .. } => {
            cmd.push_str(&format!(" --delete-parameter \"{key}\""));
        }
    }
    if delta.namespace() == Namespace::Meta {
        cmd.push_str(" --meta");
    }
    Ok(cmd)
}

/// Start, stop, or delete primitive `name`.
pub fn build_lifecycle(name: &str, action: LifecycleAction) -> Result<String> {
    check_name(name)?;
    Ok(match action {
        LifecycleAction::Start => format!("{CRM} resource start {name}"),
        LifecycleAction::Stop => format!("{CRM} resource stop {name}"),
        LifecycleAction::Delete => format!("{CRM} configure delete {name}"),
    })
}

/// Check that a declaration can be rendered.
pub fn validate_spec(spec: &ResourceSpec) -> Result<()> {
    check_name(&spec.name)?;
    check_token("agent", &spec.agent)?;

    for ns in Namespace::ALL {
        for (key, value) in spec.attributes(ns) {
            check_key(key)?;
            check_value(key, value)?;
        }
    }
    for op in &spec.operations {
        check_token("op action", &op.action)?;
        for (key, value) in &op.attributes {
            check_key(key)?;
            check_value(key, value)?;
        }
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    check_token("name", name)
}

/// Names, agents, and op actions are single bare words.
fn check_token(what: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::InvalidSpec(format!("{what} must not be empty")));
    }
    if token.chars().any(is_unsafe_in_word) {
        return Err(Error::InvalidSpec(format!(
            "{what} '{token}' contains whitespace, quotes or control characters"
        )));
    }
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_value(key, "empty key"));
    }
    if key.chars().any(|c| c == '=' || is_unsafe_in_word(c)) {
        return Err(Error::invalid_value(
            key,
            "keys cannot contain whitespace, '=', quotes or control characters",
        ));
    }
    Ok(())
}

fn check_value(key: &str, value: &str) -> Result<()> {
    if let Some(c) = value
        .chars()
        .find(|c| matches!(c, '"' | '\\') || c.is_control())
    {
        return Err(Error::invalid_value(
            key,
            format!("value contains {c:?} which cannot be quoted"),
        ));
    }
    Ok(())
}

fn is_unsafe_in_word(c: char) -> bool {
    c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operation;

    #[test]
    fn test_create_full() {
        let spec = ResourceSpec::new("vip", "ocf:heartbeat:IPaddr2")
            .with_param("ip", "10.0.0.10")
            .with_param("cidr_netmask", "24")
            .with_meta("target-role", "Started")
            .with_op(Operation::new("monitor").with("interval", "10s"));

        assert_eq!(
            build_create(&spec).unwrap(),
            "crm configure primitive vip ocf:heartbeat:IPaddr2 \
             params cidr_netmask=\"24\" ip=\"10.0.0.10\" \
             meta target-role=\"Started\" \
             op monitor interval=\"10s\""
        );
    }

    #[test]
    fn test_create_omits_empty_clauses() {
        let spec = ResourceSpec::new("dummy", "ocf:pacemaker:Dummy");
        assert_eq!(
            build_create(&spec).unwrap(),
            "crm configure primitive dummy ocf:pacemaker:Dummy"
        );

        let spec = spec.with_meta("is-managed", "false");
        assert_eq!(
            build_create(&spec).unwrap(),
            "crm configure primitive dummy ocf:pacemaker:Dummy meta is-managed=\"false\""
        );
    }

    #[test]
    fn test_set_parameter() {
        let delta = AttributeDelta::Change {
            namespace: Namespace::Parameter,
            key: "ip".into(),
            from: "10.0.0.1".into(),
            to: "10.0.0.2".into(),
        };
        assert_eq!(
            build_delta("vip", &delta).unwrap(),
            r#"crm_resource --resource vip --set-parameter "ip" --parameter-value "10.0.0.2""#
        );
    }

    #[test]
    fn test_meta_flag() {
        let add = AttributeDelta::Add {
            namespace: Namespace::Meta,
            key: "target-role".into(),
            value: "Stopped".into(),
        };
        assert_eq!(
            build_delta("vip", &add).unwrap(),
            r#"crm_resource --resource vip --set-parameter "target-role" --parameter-value "Stopped" --meta"#
        );

        let remove = AttributeDelta::Remove {
            namespace: Namespace::Meta,
            key: "target-role".into(),
        };
        assert_eq!(
            build_delta("vip", &remove).unwrap(),
            r#"crm_resource --resource vip --delete-parameter "target-role" --meta"#
        );
    }

    #[test]
    fn test_delete_parameter() {
        let remove = AttributeDelta::Remove {
            namespace: Namespace::Parameter,
            key: "nic".into(),
        };
        assert_eq!(
            build_delta("vip", &remove).unwrap(),
            r#"crm_resource --resource vip --delete-parameter "nic""#
        );
    }

    #[test]
    fn test_lifecycle() {
        assert_eq!(
            build_lifecycle("vip", LifecycleAction::Start).unwrap(),
            "crm resource start vip"
        );
        assert_eq!(
            build_lifecycle("vip", LifecycleAction::Stop).unwrap(),
            "crm resource stop vip"
        );
        assert_eq!(
            build_lifecycle("vip", LifecycleAction::Delete).unwrap(),
            "crm configure delete vip"
        );
    }

    #[test]
    fn test_rejects_quote_in_value() {
        let delta = AttributeDelta::Add {
            namespace: Namespace::Parameter,
            key: "options".into(),
            value: "say \"hi\"".into(),
        };
        let err = build_delta("web", &delta).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref key, .. } if key == "options"));

        let spec = ResourceSpec::new("web", "apache").with_param("path", "C:\\apache");
        assert!(matches!(
            build_create(&spec).unwrap_err(),
            Error::InvalidValue { .. }
        ));

        let spec = ResourceSpec::new("web", "apache").with_meta("note", "line\nbreak");
        assert!(matches!(
            build_create(&spec).unwrap_err(),
            Error::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_rejects_bad_keys() {
        let spec = ResourceSpec::new("web", "apache").with_param("a=b", "1");
        assert!(matches!(
            build_create(&spec).unwrap_err(),
            Error::InvalidValue { .. }
        ));

        let spec = ResourceSpec::new("web", "apache").with_param("", "1");
        assert!(matches!(
            build_create(&spec).unwrap_err(),
            Error::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(matches!(
            build_create(&ResourceSpec::new("", "apache")).unwrap_err(),
            Error::InvalidSpec(_)
        ));
        assert!(matches!(
            build_create(&ResourceSpec::new("web", "")).unwrap_err(),
            Error::InvalidSpec(_)
        ));
        assert!(matches!(
            build_lifecycle("web server", LifecycleAction::Stop).unwrap_err(),
            Error::InvalidSpec(_)
        ));
    }

    #[test]
    fn test_values_may_have_spaces_and_single_quotes() {
        let spec = ResourceSpec::new("web", "apache").with_param("options", "-D SSL 'x'");
        assert!(build_create(&spec).is_ok());
    }
}
