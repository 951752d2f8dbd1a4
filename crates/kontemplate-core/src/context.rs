//! Cluster context loading
//!
//! A cluster configuration file names the target context and declares the
//! resource sets to deploy into it:
//!
//! ```yaml
//! context: k8s.prod.example.com
//! global:
//!   REPLICAS: 3
//! import:
//!   - vars/common.yaml
//! helmRepositories:
//!   - name: bitnami
//!     url: https://charts.bitnami.com/bitnami
//! include:
//!   - name: frontend
//!     values:
//!       REPLICAS: 5
//!   - name: db
//!     type: helm
//!     chart: bitnami/postgresql
//! ```
//!
//! Loading resolves every resource set's variables up front, so later stages
//! only ever see a single merged mapping per set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::values::Values;

/// How a resource set is handed to the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceSetKind {
    /// Directory of manifest templates passed to kubectl
    #[default]
    Kubectl,
    /// Helm chart release, optionally fed templated values files
    Helm,
}

impl std::fmt::Display for ResourceSetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kubectl => write!(f, "kubectl"),
            Self::Helm => write!(f, "helm"),
        }
    }
}

/// A helm chart repository registered before deploying
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmRepository {
    pub name: String,
    pub url: String,
}

/// Cluster configuration file as written on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Name of the kubectl context to deploy into
    pub context: String,

    #[serde(default)]
    pub global: Option<Values>,

    /// Variable files merged beneath `global`, relative to the config file
    #[serde(default)]
    pub import: Vec<PathBuf>,

    #[serde(default)]
    pub helm_repositories: Vec<HelmRepository>,

    #[serde(default)]
    pub include: Vec<ResourceSetConfig>,
}

/// A resource set entry as written on disk
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSetConfig {
    pub name: String,

    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub values: Option<Values>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default, rename = "type")]
    pub kind: ResourceSetKind,

    #[serde(default)]
    pub chart: Option<String>,

    /// Nested resource sets; makes this entry a grouping set
    #[serde(default)]
    pub include: Vec<ResourceSetConfig>,
}

/// A resource set with its variables fully resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSetDeclaration {
    /// Unique name; nested sets are named `parent/child`
    pub name: String,
    pub kind: ResourceSetKind,
    /// Template directory or single template file
    pub path: PathBuf,
    /// Chart reference, helm sets only
    pub chart: Option<String>,
    /// Merged variables: global < local < caller overrides
    pub values: Values,
    /// Extra arguments appended to the dispatch command
    pub args: Vec<String>,
}

impl ResourceSetDeclaration {
    /// Whether an include/exclude entry selects this set
    ///
    /// An entry matches the set itself or any grouping set it is nested in,
    /// so `monitoring` selects `monitoring/prometheus`.
    pub fn matches(&self, selector: &str) -> bool {
        let selector = selector.trim_end_matches('/');
        self.name == selector
            || self
                .name
                .strip_prefix(selector)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// The target cluster and everything that will be deployed to it
#[derive(Debug, Clone)]
pub struct Context {
    /// Cluster context name passed to kubectl and helm
    pub name: String,
    /// Global variables (imports merged beneath)
    pub global: Values,
    pub helm_repositories: Vec<HelmRepository>,
    /// Resource sets in declaration order, nested sets flattened
    pub resource_sets: Vec<ResourceSetDeclaration>,
    /// Directory containing the configuration file
    pub base_dir: PathBuf,
}

impl Context {
    /// Load a cluster configuration file and resolve variables
    ///
    /// `overrides` always win over both global and resource-set values.
    pub fn load<P: AsRef<Path>>(path: P, overrides: &Values) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let config: ClusterConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let context = Self::from_config(config, base_dir, overrides)?;

        tracing::debug!(
            context = %context.name,
            resource_sets = context.resource_sets.len(),
            "loaded cluster configuration from {}",
            path.display()
        );

        Ok(context)
    }

    /// Build a context from an already parsed configuration
    ///
    /// Imports are resolved against `base_dir`.
    pub fn from_config(
        config: ClusterConfig,
        base_dir: PathBuf,
        overrides: &Values,
    ) -> Result<Self> {
        if config.context.trim().is_empty() {
            return Err(ConfigError::InvalidContext {
                message: "`context` must name a cluster context".to_string(),
            });
        }

        let mut global = Values::new();
        for import in &config.import {
            let imported = Values::from_file(base_dir.join(import))?;
            global.merge(&imported);
        }
        if let Some(values) = &config.global {
            global.merge(&mapping(values, "global")?);
        }

        let mut resource_sets = Vec::new();
        flatten_resource_sets(
            &config.include,
            None,
            &global,
            &Values::new(),
            overrides,
            &base_dir,
            &mut resource_sets,
        )?;

        let mut seen = HashSet::new();
        for rs in &resource_sets {
            if !seen.insert(rs.name.as_str()) {
                return Err(ConfigError::DuplicateResourceSet {
                    name: rs.name.clone(),
                });
            }
        }

        for repo in &config.helm_repositories {
            if repo.name.is_empty() || repo.url.is_empty() {
                return Err(ConfigError::InvalidContext {
                    message: "helm repositories need both a name and a url".to_string(),
                });
            }
        }

        Ok(Self {
            name: config.context,
            global,
            helm_repositories: config.helm_repositories,
            resource_sets,
            base_dir,
        })
    }

    /// Look up a resource set by its full name
    pub fn resource_set(&self, name: &str) -> Option<&ResourceSetDeclaration> {
        self.resource_sets.iter().find(|rs| rs.name == name)
    }
}

/// Walk nested declarations depth-first, preserving declaration order
fn flatten_resource_sets(
    sets: &[ResourceSetConfig],
    parent: Option<&str>,
    global: &Values,
    inherited: &Values,
    overrides: &Values,
    base_dir: &Path,
    out: &mut Vec<ResourceSetDeclaration>,
) -> Result<()> {
    for set in sets {
        if set.name.trim().is_empty() {
            return Err(ConfigError::InvalidResourceSet {
                name: set.name.clone(),
                message: "resource set names must not be empty".to_string(),
            });
        }

        let name = match parent {
            Some(parent) => format!("{}/{}", parent, set.name),
            None => set.name.clone(),
        };

        let mut local = inherited.clone();
        if let Some(values) = &set.values {
            local.merge(&mapping(values, &name)?);
        }

        if !set.include.is_empty() {
            if set.chart.is_some() || set.kind == ResourceSetKind::Helm {
                return Err(ConfigError::InvalidResourceSet {
                    name,
                    message: "a set with nested `include` entries cannot be a helm release"
                        .to_string(),
                });
            }
            flatten_resource_sets(
                &set.include,
                Some(&name),
                global,
                &local,
                overrides,
                base_dir,
                out,
            )?;
            continue;
        }

        let chart = match (set.kind, &set.chart) {
            (ResourceSetKind::Helm, Some(chart)) => Some(chart.clone()),
            (ResourceSetKind::Helm, None) => {
                return Err(ConfigError::InvalidResourceSet {
                    name,
                    message: "helm resource sets must declare a `chart`".to_string(),
                });
            }
            (ResourceSetKind::Kubectl, Some(_)) => {
                return Err(ConfigError::InvalidResourceSet {
                    name,
                    message: "`chart` is only valid with `type: helm`".to_string(),
                });
            }
            (ResourceSetKind::Kubectl, None) => None,
        };

        let path = match &set.path {
            Some(path) => base_dir.join(path),
            None => base_dir.join(&name),
        };

        let values = Values::merge_all([global, &local, overrides]);

        out.push(ResourceSetDeclaration {
            name,
            kind: set.kind,
            path,
            chart,
            values,
            args: set.args.clone(),
        });
    }

    Ok(())
}

/// Treat an explicit `null` as empty and reject non-mapping variables
fn mapping(values: &Values, owner: &str) -> Result<Values> {
    match values.inner() {
        serde_json::Value::Null => Ok(Values::new()),
        serde_json::Value::Object(_) => Ok(values.clone()),
        _ => Err(ConfigError::InvalidVariable {
            message: format!("variables of '{}' must be a mapping", owner),
        }),
    }
}
