// src/config/model.rs

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::parse_env_entries;
use crate::registry::{ActiveEnvironment, EnvironmentRegistry};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [environment.c1]
/// root = "/srv/c1"
/// env = ["PATH=/usr/bin:/bin"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// All environments from `[environment.<id>]`, keyed by id.
    #[serde(default)]
    pub environment: BTreeMap<String, EnvironmentConfig>,
}

/// `[environment.<id>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentConfig {
    /// Default working directory for processes in this environment.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Base `NAME=VALUE` entries merged into every exec in this environment.
    #[serde(default)]
    pub env: Vec<String>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    environment: BTreeMap<String, EnvironmentConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(environment: BTreeMap<String, EnvironmentConfig>) -> Self {
        Self { environment }
    }

    pub fn environments(&self) -> impl Iterator<Item = (&str, &EnvironmentConfig)> {
        self.environment.iter().map(|(id, env)| (id.as_str(), env))
    }

    pub fn environment(&self, id: &str) -> Option<&EnvironmentConfig> {
        self.environment.get(id)
    }

    /// Base environment variables configured for `id` (empty if unknown).
    pub fn base_env(&self, id: &str) -> HashMap<String, String> {
        self.environment
            .get(id)
            .map(|env| parse_env_entries(&env.env))
            .unwrap_or_default()
    }

    /// Build a registry with one active entry per configured environment.
    pub fn registry(&self) -> EnvironmentRegistry {
        let registry = EnvironmentRegistry::new();
        for (id, env) in self.environments() {
            let mut active = ActiveEnvironment::new(id);
            if let Some(ref root) = env.root {
                active = active.with_root_dir(root.clone());
            }
            registry.insert(active);
        }
        registry
    }
}
