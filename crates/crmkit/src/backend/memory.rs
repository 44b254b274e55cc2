//! In-memory cluster backend.
//!
//! Interprets the commands produced by [`crate::command`] against a simulated
//! CIB, so whole reconciliation passes can run without a cluster.

use crate::backend::Backend;
use crate::cib::{Definition, parser, writer};
use crate::error::{Error, Result};
use crate::types::ResourceSpec;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// An object stored in the simulated CIB.
#[derive(Debug, Clone)]
enum Object {
    Primitive(ResourceSpec),
    /// Verbatim definition of a non-primitive object
    Raw(String),
}

#[derive(Debug, Default)]
struct Cluster {
    objects: BTreeMap<String, Object>,
    running: BTreeSet<String>,
    applied: Vec<String>,
    fail_on: Option<String>,
}

/// Backend holding the cluster configuration in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    cluster: Mutex<Cluster>,
}

impl MemoryBackend {
    /// Create an empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cluster that already contains `spec`.
    pub fn with_primitive(spec: ResourceSpec) -> Self {
        let backend = Self::new();
        backend.insert_primitive(spec);
        backend
    }

    /// Copy one object and its run state from another backend.
    ///
    /// Passes run against the copy see the same live state but change
    /// nothing on the source, which is how dry runs are simulated.
    pub fn snapshot_of(source: &dyn Backend, name: &str) -> Result<Self> {
        let backend = Self::new();
        if let Some(text) = source.query(name)? {
            match parser::parse_definition(name, &text) {
                Ok(Some(Definition::Primitive(state))) => backend.insert_primitive(state.into()),
                // keep foreign and unparsable text so the pass reports it
                _ => backend.insert_raw(name, &text),
            }
            backend.set_running(name, source.is_running(name)?);
        }
        Ok(backend)
    }

    /// Store a primitive.
    pub fn insert_primitive(&self, spec: ResourceSpec) {
        self.lock()
            .objects
            .insert(spec.name.clone(), Object::Primitive(spec));
    }

    /// Store an arbitrary definition (groups, clones, broken text, ...).
    pub fn insert_raw(&self, name: &str, definition: &str) {
        self.lock()
            .objects
            .insert(name.to_string(), Object::Raw(definition.to_string()));
    }

    /// Mark a resource as running or stopped.
    pub fn set_running(&self, name: &str, running: bool) {
        let mut cluster = self.lock();
        if running {
            cluster.running.insert(name.to_string());
        } else {
            cluster.running.remove(name);
        }
    }

    /// Fail every command containing `pattern`.
    pub fn fail_on(&self, pattern: &str) {
        self.lock().fail_on = Some(pattern.to_string());
    }

    /// Stop injecting failures.
    pub fn clear_failure(&self) {
        self.lock().fail_on = None;
    }

    /// Commands applied successfully so far.
    pub fn applied(&self) -> Vec<String> {
        self.lock().applied.clone()
    }

    /// The stored primitive, if `name` is one.
    pub fn primitive(&self, name: &str) -> Option<ResourceSpec> {
        match self.lock().objects.get(name) {
            Some(Object::Primitive(spec)) => Some(spec.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cluster> {
        // a panic while holding the lock leaves plain data behind
        self.cluster
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Backend for MemoryBackend {
    fn query(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lock().objects.get(name).map(|object| match object {
            Object::Primitive(spec) => writer::render(spec),
            Object::Raw(definition) => definition.clone(),
        }))
    }

    fn apply(&self, command: &str) -> Result<()> {
        let mut cluster = self.lock();
        let fail = |diagnostic: &str| Error::ExternalCommand {
            command: command.to_string(),
            diagnostic: diagnostic.to_string(),
        };

        if let Some(pattern) = &cluster.fail_on
            && command.contains(pattern.as_str())
        {
            return Err(fail("injected failure"));
        }

        let words = shlex::split(command).ok_or_else(|| fail("cannot split command line"))?;
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        match words.as_slice() {
            ["crm", "configure", "primitive", name, ..] => {
                if cluster.objects.contains_key(*name) {
                    return Err(fail("object already exists"));
                }
                let definition = command
                    .strip_prefix("crm configure ")
                    .ok_or_else(|| fail("malformed create"))?;
                let state = parser::parse(name, definition)
                    .map_err(|e| fail(&e.to_string()))?
                    .ok_or_else(|| fail("malformed create"))?;
                cluster
                    .objects
                    .insert((*name).to_string(), Object::Primitive(state.into()));
            }
            ["crm", "configure", "delete", name] => {
                if cluster.running.contains(*name) {
                    return Err(fail("resource is running"));
                }
                if cluster.objects.remove(*name).is_none() {
                    return Err(fail("object does not exist"));
                }
            }
            ["crm", "resource", action @ ("start" | "stop"), name] => {
                if !cluster.objects.contains_key(*name) {
                    return Err(fail("resource does not exist"));
                }
                if *action == "start" {
                    cluster.running.insert((*name).to_string());
                } else {
                    cluster.running.remove(*name);
                }
            }
            ["crm_resource", "--resource", name, rest @ ..] => {
                let spec = match cluster.objects.get_mut(*name) {
                    Some(Object::Primitive(spec)) => spec,
                    _ => return Err(fail("resource does not exist")),
                };
                let (rest, meta) = match rest {
                    [head @ .., "--meta"] => (head, true),
                    _ => (rest, false),
                };
                let attributes = if meta {
                    &mut spec.meta
                } else {
                    &mut spec.params
                };
                match rest {
                    ["--set-parameter", key, "--parameter-value", value] => {
                        attributes.insert((*key).to_string(), (*value).to_string());
                    }
                    ["--delete-parameter", key] => {
                        attributes.remove(*key);
                    }
                    _ => return Err(fail("unsupported crm_resource arguments")),
                }
            }
            _ => return Err(fail("unsupported command")),
        }

        cluster.applied.push(command.to_string());
        Ok(())
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        Ok(self.lock().running.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command;
    use crate::types::{AttributeDelta, LifecycleAction, Namespace};

    #[test]
    fn test_create_then_query() {
        let backend = MemoryBackend::new();
        let spec = ResourceSpec::new("vip", "ocf:heartbeat:IPaddr2").with_param("ip", "10.0.0.1");

        backend.apply(&command::build_create(&spec).unwrap()).unwrap();

        let text = backend.query("vip").unwrap().unwrap();
        assert!(text.starts_with("primitive vip ocf:heartbeat:IPaddr2"));
        assert_eq!(backend.primitive("vip"), Some(spec));
    }

    #[test]
    fn test_set_and_delete_meta() {
        let backend = MemoryBackend::with_primitive(ResourceSpec::new("vip", "IPaddr2"));
        let add = AttributeDelta::Add {
            namespace: Namespace::Meta,
            key: "target-role".into(),
            value: "Started".into(),
        };
        backend.apply(&command::build_delta("vip", &add).unwrap()).unwrap();
        assert_eq!(backend.primitive("vip").unwrap().meta["target-role"], "Started");

        let remove = AttributeDelta::Remove {
            namespace: Namespace::Meta,
            key: "target-role".into(),
        };
        backend.apply(&command::build_delta("vip", &remove).unwrap()).unwrap();
        assert!(backend.primitive("vip").unwrap().meta.is_empty());
        assert_eq!(backend.applied().len(), 2);
    }

    #[test]
    fn test_lifecycle() {
        let backend = MemoryBackend::with_primitive(ResourceSpec::new("vip", "IPaddr2"));
        let start = command::build_lifecycle("vip", LifecycleAction::Start).unwrap();
        let delete = command::build_lifecycle("vip", LifecycleAction::Delete).unwrap();

        backend.apply(&start).unwrap();
        assert!(backend.is_running("vip").unwrap());
        assert!(backend.apply(&delete).is_err());

        backend.set_running("vip", false);
        backend.apply(&delete).unwrap();
        assert!(backend.query("vip").unwrap().is_none());
    }

    #[test]
    fn test_injected_failure_is_not_recorded() {
        let backend = MemoryBackend::with_primitive(ResourceSpec::new("vip", "IPaddr2"));
        backend.fail_on("resource start");

        let err = backend.apply("crm resource start vip").unwrap_err();
        assert!(matches!(err, Error::ExternalCommand { .. }));
        assert!(backend.applied().is_empty());
        assert!(!backend.is_running("vip").unwrap());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let source = MemoryBackend::with_primitive(ResourceSpec::new("vip", "IPaddr2"));
        source.set_running("vip", true);

        let copy = MemoryBackend::snapshot_of(&source, "vip").unwrap();
        assert!(copy.is_running("vip").unwrap());

        copy.apply("crm resource stop vip").unwrap();
        assert!(source.is_running("vip").unwrap());
        assert!(source.applied().is_empty());
    }

    #[test]
    fn test_snapshot_keeps_foreign_text() {
        let source = MemoryBackend::new();
        source.insert_raw("vip", "group vip ip1");

        let copy = MemoryBackend::snapshot_of(&source, "vip").unwrap();
        assert_eq!(copy.query("vip").unwrap().as_deref(), Some("group vip ip1"));
        assert!(MemoryBackend::snapshot_of(&source, "other").unwrap().query("other").unwrap().is_none());
    }

    #[test]
    fn test_raw_objects_are_returned_verbatim() {
        let backend = MemoryBackend::new();
        backend.insert_raw("vip", "group vip ip1 ip2");
        assert_eq!(backend.query("vip").unwrap().as_deref(), Some("group vip ip1 ip2"));
        assert!(backend.primitive("vip").is_none());
    }
}
