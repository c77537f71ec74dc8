// src/builders.rs

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use execdriver::config::{ConfigFile, EnvironmentConfig, RawConfigFile};
use execdriver::registry::{ActiveEnvironment, EnvironmentRegistry};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                environment: BTreeMap::new(),
            },
        }
    }

    pub fn with_environment(mut self, id: &str, env: EnvironmentConfig) -> Self {
        self.config.environment.insert(id.to_string(), env);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `EnvironmentConfig`.
pub struct EnvironmentConfigBuilder {
    env: EnvironmentConfig,
}

impl EnvironmentConfigBuilder {
    pub fn new() -> Self {
        Self {
            env: EnvironmentConfig {
                root: None,
                env: vec![],
            },
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.env.root = Some(root.into());
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.env.env.push(entry.to_string());
        self
    }

    pub fn build(self) -> EnvironmentConfig {
        self.env
    }
}

impl Default for EnvironmentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with one active environment per id.
pub fn registry_with(ids: &[&str]) -> EnvironmentRegistry {
    let registry = EnvironmentRegistry::new();
    for id in ids {
        registry.insert(ActiveEnvironment::new(*id));
    }
    registry
}
