// src/exec/driver.rs

//! The exec operation: launch one process inside one active container.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::compute::{ComputeSystem, CreateProcessParams};
use crate::errors::{ExecError, Result};
use crate::registry::EnvironmentRegistry;
use crate::types::ExecStage;

use super::bridge::{Pipes, spawn_bridges};
use super::command;
use super::process::ProcessConfig;
use super::terminal::Terminal;

/// Hook invoked once the process is running and its streams are wired,
/// with the process config and the process id.
pub type StartCallback<'a> = Box<dyn FnOnce(&ProcessConfig, u32) + Send + 'a>;

/// Launches processes in active containers through a [`ComputeSystem`].
///
/// The driver reads the registry but never adds or removes environments.
#[derive(Clone)]
pub struct ExecDriver {
    registry: EnvironmentRegistry,
    compute: Arc<dyn ComputeSystem>,
}

impl fmt::Debug for ExecDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecDriver")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ExecDriver {
    pub fn new(registry: EnvironmentRegistry, compute: Arc<dyn ComputeSystem>) -> Self {
        Self { registry, compute }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    /// Run `config` inside container `container_id` and wait for it to exit.
    ///
    /// Sequence: validate the invocation, resolve the container, create the
    /// process, start one copy task per returned stdio handle, attach the
    /// terminal to `config`, invoke `start_callback`, then wait.
    ///
    /// Returns the process's exit code. Every error corresponds to exit code
    /// `-1` ([`ExecError::exit_code`]). Stream copy failures never surface
    /// here. If waiting fails the process is left as is; nothing kills it.
    ///
    /// There is no internal timeout; race this future to impose one.
    pub async fn exec(
        &self,
        container_id: &str,
        config: &mut ProcessConfig,
        pipes: Pipes,
        start_callback: Option<StartCallback<'_>>,
    ) -> Result<i32> {
        match self
            .exec_inner(container_id, config, pipes, start_callback)
            .await
        {
            Ok(code) => Ok(code),
            Err(err) => {
                error!(
                    container_id = %container_id,
                    exit_code = err.exit_code(),
                    error = %err,
                    "exec failed"
                );
                Err(err)
            }
        }
    }

    async fn exec_inner(
        &self,
        container_id: &str,
        config: &mut ProcessConfig,
        pipes: Pipes,
        start_callback: Option<StartCallback<'_>>,
    ) -> Result<i32> {
        enter(container_id, ExecStage::Validating);
        let built = command::build(config)?;

        let env = self
            .registry
            .lookup(container_id)
            .ok_or_else(|| ExecError::EnvironmentNotFound {
                container_id: container_id.to_string(),
            })?;
        enter(&env.id, ExecStage::EnvironmentResolved);

        let params = CreateProcessParams {
            emulate_console: config.tty,
            working_directory: config.working_dir.clone(),
            command_line: built.command_line,
            environment: built.environment,
        };
        let stdio = pipes.stdio_request();

        let mut process = self
            .compute
            .create_process(&env.id, stdio, params)
            .await
            .map_err(|e| ExecError::ProcessCreationFailed {
                container_id: env.id.clone(),
                source: e.into(),
            })?;
        let pid = process.pid;
        enter(&env.id, ExecStage::ProcessCreated);
        info!(container_id = %env.id, pid, tty = config.tty, "process created");

        // Detached; their outcome is only visible in the logs.
        let copies = spawn_bridges(&env.id, &mut process, &pipes);
        debug!(container_id = %env.id, pid, streams = copies.len(), "stream copies started");
        enter(&env.id, ExecStage::StreamsBound);

        config.terminal = Some(Terminal::for_process(
            config.tty,
            Arc::clone(&self.compute),
            &env.id,
            pid,
        ));

        if let Some(callback) = start_callback {
            callback(&*config, pid);
        }
        enter(&env.id, ExecStage::Started);

        enter(&env.id, ExecStage::Waiting);
        let exit_code = self
            .compute
            .wait_for_process(&env.id, pid)
            .await
            .map_err(|e| ExecError::WaitFailed {
                container_id: env.id.clone(),
                pid,
                source: e.into(),
            })?;

        enter(&env.id, ExecStage::Terminated(exit_code));
        info!(container_id = %env.id, pid, exit_code, "process exited");
        Ok(exit_code)
    }
}

fn enter(container_id: &str, stage: ExecStage) {
    debug!(container_id = %container_id, stage = %stage, "exec stage");
}
