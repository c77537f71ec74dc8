// src/compute/local.rs

//! Host-process backend.
//!
//! Runs each "container" process as a child of the current process, through
//! the platform shell, with the environment's root directory as default
//! working directory. There is no real isolation boundary here; this backend
//! exists so the driver can be used (and tested end to end) on any machine.
//!
//! Each child is owned by a reaper task that publishes its exit state on a
//! `watch` channel. The process table only holds the receiving end, so a
//! process stays known (and resizable) while someone waits on it, and
//! dropping a wait future neither kills nor loses the process. An entry is
//! removed once its exit state has been collected by `wait_for_process`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, anyhow, bail};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::registry::EnvironmentRegistry;

use super::{
    BoxFuture, ComputeSystem, CreateProcessParams, CreatedProcess, ProcessOutput, ProcessStdin,
    StdioRequest,
};

type ProcessKey = (String, u32);

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExitState {
    Running,
    Exited(i32),
    Signaled,
    Failed(String),
}

impl ExitState {
    fn is_running(&self) -> bool {
        matches!(self, ExitState::Running)
    }
}

/// [`ComputeSystem`] that spawns host processes with `tokio::process`.
#[derive(Debug)]
pub struct LocalComputeSystem {
    registry: EnvironmentRegistry,
    children: Mutex<HashMap<ProcessKey, watch::Receiver<ExitState>>>,
    console_sizes: Mutex<HashMap<ProcessKey, (u16, u16)>>,
}

impl LocalComputeSystem {
    /// Create a backend resolving environments through `registry`.
    pub fn new(registry: EnvironmentRegistry) -> Self {
        Self {
            registry,
            children: Mutex::new(HashMap::new()),
            console_sizes: Mutex::new(HashMap::new()),
        }
    }

    /// Last `(height, width)` requested through `resize_console`.
    pub fn console_size(&self, env_id: &str, pid: u32) -> Option<(u16, u16)> {
        lock(&self.console_sizes)
            .get(&(env_id.to_string(), pid))
            .copied()
    }

    /// Number of processes created but not yet waited on.
    pub fn running_processes(&self) -> usize {
        lock(&self.children).len()
    }

    fn spawn(
        &self,
        env_id: &str,
        stdio: StdioRequest,
        params: CreateProcessParams,
    ) -> anyhow::Result<CreatedProcess> {
        let env = self
            .registry
            .lookup(env_id)
            .ok_or_else(|| anyhow!("environment '{env_id}' is not active"))?;

        if params.emulate_console {
            warn!(
                container_id = %env_id,
                "local backend cannot allocate a console; using plain pipes"
            );
        }

        let mut cmd = shell_command(&params.command_line);

        let cwd = params
            .working_directory
            .map(PathBuf::from)
            .or_else(|| env.root_dir.clone());
        if let Some(ref dir) = cwd {
            cmd.current_dir(dir);
        }

        cmd.env_clear();
        for entry in &params.environment {
            match entry.split_once('=') {
                Some((name, value)) => cmd.env(name, value),
                None => cmd.env(entry, ""),
            };
        }

        cmd.stdin(piped_if(stdio.stdin))
            .stdout(piped_if(stdio.stdout))
            .stderr(piped_if(stdio.stderr));

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "spawning '{}' in environment '{env_id}'",
                params.command_line
            )
        })?;

        let pid = child
            .id()
            .context("spawned process exited before its pid could be read")?;

        let created = CreatedProcess {
            pid,
            stdin: child.stdin.take().map(|s| Box::new(s) as ProcessStdin),
            stdout: child.stdout.take().map(|s| Box::new(s) as ProcessOutput),
            stderr: child.stderr.take().map(|s| Box::new(s) as ProcessOutput),
        };

        info!(
            container_id = %env_id,
            pid,
            cwd = ?cwd,
            "local process started"
        );

        let exit = spawn_reaper(env_id, pid, child);
        lock(&self.children).insert((env_id.to_string(), pid), exit);
        Ok(created)
    }
}

impl ComputeSystem for LocalComputeSystem {
    fn create_process<'a>(
        &'a self,
        env_id: &'a str,
        stdio: StdioRequest,
        params: CreateProcessParams,
    ) -> BoxFuture<'a, anyhow::Result<CreatedProcess>> {
        Box::pin(async move { self.spawn(env_id, stdio, params) })
    }

    fn wait_for_process<'a>(
        &'a self,
        env_id: &'a str,
        pid: u32,
    ) -> BoxFuture<'a, anyhow::Result<i32>> {
        Box::pin(async move {
            let key = (env_id.to_string(), pid);

            // Clone the receiver so the lock isn't held across the await.
            let mut exit = lock(&self.children)
                .get(&key)
                .cloned()
                .ok_or_else(|| anyhow!("no process {pid} in environment '{env_id}'"))?;

            let state = exit
                .wait_for(|state| !state.is_running())
                .await
                .map_err(|_| anyhow!("lost track of process {pid} in '{env_id}'"))?
                .clone();

            lock(&self.children).remove(&key);
            lock(&self.console_sizes).remove(&key);

            match state {
                ExitState::Exited(code) => Ok(code),
                ExitState::Signaled => {
                    bail!("process {pid} in '{env_id}' was terminated by a signal")
                }
                ExitState::Failed(reason) => {
                    bail!("waiting for process {pid} in '{env_id}': {reason}")
                }
                ExitState::Running => bail!("process {pid} in '{env_id}' is still running"),
            }
        })
    }

    fn resize_console<'a>(
        &'a self,
        env_id: &'a str,
        pid: u32,
        height: u16,
        width: u16,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let key = (env_id.to_string(), pid);
            if !lock(&self.children).contains_key(&key) {
                bail!("no process {pid} in environment '{env_id}'");
            }
            debug!(container_id = %env_id, pid, height, width, "console resized");
            lock(&self.console_sizes).insert(key, (height, width));
            Ok(())
        })
    }
}

/// Move `child` into a task that waits for it and publishes the result.
fn spawn_reaper(env_id: &str, pid: u32, mut child: Child) -> watch::Receiver<ExitState> {
    let (tx, rx) = watch::channel(ExitState::Running);
    let container_id = env_id.to_string();

    tokio::spawn(async move {
        let state = match child.wait().await {
            Ok(status) => match status.code() {
                Some(code) => ExitState::Exited(code),
                None => ExitState::Signaled,
            },
            Err(e) => ExitState::Failed(e.to_string()),
        };
        debug!(container_id = %container_id, pid, state = ?state, "local process exited");
        tx.send_replace(state);
    });

    rx
}

/// Build a shell command appropriate for the platform.
fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("/bin/sh");
        c.arg("-c").arg(command_line);
        c
    }
}

fn piped_if(wanted: bool) -> Stdio {
    if wanted { Stdio::piped() } else { Stdio::null() }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
