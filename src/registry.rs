// src/registry.rs

//! Registry of currently active environments (containers).
//!
//! The registry is an explicitly owned, cloneable handle around a shared map.
//! Container lifecycle code inserts an entry before any exec call targets it
//! and removes it on teardown; the exec driver only ever calls [`lookup`].
//!
//! [`lookup`]: EnvironmentRegistry::lookup

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

/// Handle describing one active isolated environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEnvironment {
    pub id: String,
    /// Default working directory for processes that don't ask for one.
    pub root_dir: Option<PathBuf>,
}

impl ActiveEnvironment {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            root_dir: None,
        }
    }

    pub fn with_root_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root.into());
        self
    }
}

/// Thread-safe map of environment id -> [`ActiveEnvironment`].
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<ActiveEnvironment>>>>,
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an environment, replacing any previous entry with the same id.
    pub fn insert(&self, env: ActiveEnvironment) -> Option<Arc<ActiveEnvironment>> {
        debug!(container_id = %env.id, "registering active environment");
        self.write().insert(env.id.clone(), Arc::new(env))
    }

    /// Remove an environment (container teardown).
    pub fn remove(&self, id: &str) -> Option<Arc<ActiveEnvironment>> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            debug!(container_id = %id, "removed active environment");
        }
        removed
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<ActiveEnvironment>> {
        self.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Sorted ids of all active environments.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated
    // (every mutation is a single insert/remove), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ActiveEnvironment>>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ActiveEnvironment>>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
