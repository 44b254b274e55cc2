use anyhow::{Context, Result, bail};
use crmkit::{Attributes, ForeignObjectPolicy, LifecycleAction, Operation, ResourceSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Get the default declarations file path
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("crmsync").join("primitives.toml"))
}

// ============================================================================
// Declarations
// ============================================================================

/// The crmsync declarations file
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrmsyncConfig {
    /// Fail instead of treating same-named non-primitives as absent
    #[serde(default)]
    pub strict: bool,

    /// Primitives reconciled in parallel
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    #[serde(default, rename = "primitive")]
    pub primitives: Vec<PrimitiveDecl>,
}

fn default_jobs() -> usize {
    4
}

impl Default for CrmsyncConfig {
    fn default() -> Self {
        Self {
            strict: false,
            jobs: default_jobs(),
            primitives: Vec::new(),
        }
    }
}

/// One declared primitive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrimitiveDecl {
    pub name: String,
    pub agent: String,

    /// Actions to run, in order
    #[serde(default = "default_actions")]
    pub action: Vec<Action>,

    #[serde(default)]
    pub params: Attributes,

    #[serde(default)]
    pub meta: Attributes,

    #[serde(default)]
    pub op: Vec<OpDecl>,
}

fn default_actions() -> Vec<Action> {
    vec![Action::Create]
}

/// `[[primitive.op]]` table: `name` plus free-form attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpDecl {
    pub name: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

/// Declared action on a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Delete,
    Start,
    Stop,
}

impl Action {
    /// The lifecycle action, if this is not `create`
    pub fn lifecycle(self) -> Option<LifecycleAction> {
        match self {
            Self::Create => None,
            Self::Delete => Some(LifecycleAction::Delete),
            Self::Start => Some(LifecycleAction::Start),
            Self::Stop => Some(LifecycleAction::Stop),
        }
    }
}

impl PrimitiveDecl {
    /// Desired state for the reconciler
    pub fn to_spec(&self) -> ResourceSpec {
        ResourceSpec {
            name: self.name.clone(),
            agent: self.agent.clone(),
            params: self.params.clone(),
            meta: self.meta.clone(),
            operations: self
                .op
                .iter()
                .map(|op| Operation {
                    action: op.name.clone(),
                    attributes: op.attributes.clone(),
                })
                .collect(),
        }
    }
}

impl CrmsyncConfig {
    /// Load declarations from `path`, or from the default location
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(p).as_ref()),
            None => default_path()?,
        };
        Self::load_from(&path)
    }

    /// Load declarations from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read declarations: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check names and agents before anything talks to the cluster
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for decl in &self.primitives {
            if decl.name.trim().is_empty() {
                bail!("primitive with agent '{}' has an empty name", decl.agent);
            }
            if decl.agent.trim().is_empty() {
                bail!("primitive '{}' has an empty agent", decl.name);
            }
            if decl.action.is_empty() {
                bail!("primitive '{}' declares no actions", decl.name);
            }
            if !seen.insert(decl.name.as_str()) {
                bail!("primitive '{}' is declared twice", decl.name);
            }
        }
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        Ok(())
    }

    /// Policy for same-named non-primitive objects
    pub fn policy(&self) -> ForeignObjectPolicy {
        if self.strict {
            ForeignObjectPolicy::Reject
        } else {
            ForeignObjectPolicy::TreatAsAbsent
        }
    }

    /// Declarations matching `target` (all when `None`)
    pub fn select(&self, target: Option<&str>) -> Result<Vec<&PrimitiveDecl>> {
        match target {
            None => Ok(self.primitives.iter().collect()),
            Some(name) => match self.primitives.iter().find(|p| p.name == name) {
                Some(decl) => Ok(vec![decl]),
                None => bail!("No primitive named '{name}' is declared"),
            },
        }
    }
}
