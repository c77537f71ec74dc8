// src/compute/mod.rs

//! Isolation backend abstraction.
//!
//! The exec driver never creates processes itself; it talks to a
//! `ComputeSystem` that knows how to start a process inside an existing
//! environment, hand back its stdio handles, wait for it, and control its
//! console.
//!
//! - [`local`] provides `LocalComputeSystem`, which runs processes on the
//!   host and is what the `execdriver` binary uses.
//! - Tests can provide their own implementation that simulates processes
//!   without spawning anything (see `execdriver-test-utils`).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

pub mod local;

pub use local::LocalComputeSystem;

/// Boxed future returned by [`ComputeSystem`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Write end of a process's stdin.
pub type ProcessStdin = Box<dyn AsyncWrite + Send + Unpin>;

/// Read end of a process's stdout or stderr.
pub type ProcessOutput = Box<dyn AsyncRead + Send + Unpin>;

/// Which stdio pipes the backend should create for the new process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdioRequest {
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: bool,
}

/// Parameters for creating a process inside an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateProcessParams {
    /// Attach the process to an emulated console instead of plain pipes.
    pub emulate_console: bool,
    pub working_directory: Option<String>,
    /// Full command line, entrypoint first.
    pub command_line: String,
    /// `NAME=VALUE` entries.
    pub environment: Vec<String>,
}

/// A process that was successfully created by the backend.
///
/// Any of the stdio handles may be absent, either because it was not
/// requested or because the backend did not provide one.
pub struct CreatedProcess {
    pub pid: u32,
    pub stdin: Option<ProcessStdin>,
    pub stdout: Option<ProcessOutput>,
    pub stderr: Option<ProcessOutput>,
}

impl fmt::Debug for CreatedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedProcess")
            .field("pid", &self.pid)
            .field("stdin", &self.stdin.is_some())
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

/// Trait abstracting the isolation environment API.
///
/// Every operation is scoped by environment id; process ids are only
/// meaningful together with the environment they were created in.
pub trait ComputeSystem: Send + Sync {
    /// Create and start a process inside `env_id`.
    fn create_process<'a>(
        &'a self,
        env_id: &'a str,
        stdio: StdioRequest,
        params: CreateProcessParams,
    ) -> BoxFuture<'a, anyhow::Result<CreatedProcess>>;

    /// Block until the process exits and return its exit code.
    fn wait_for_process<'a>(
        &'a self,
        env_id: &'a str,
        pid: u32,
    ) -> BoxFuture<'a, anyhow::Result<i32>>;

    /// Resize the console attached to the process.
    fn resize_console<'a>(
        &'a self,
        env_id: &'a str,
        pid: u32,
        height: u16,
        width: u16,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}
