// src/exec/terminal.rs

//! Terminal attached to an exec'd process.
//!
//! Exactly two variants exist, chosen once when the process is launched:
//!
//! - [`Terminal::Console`]: the process runs with console emulation; resize
//!   requests are forwarded to the backend, scoped by container id and pid.
//! - [`Terminal::Plain`]: plain pipes; every operation is a no-op.
//!
//! Callers use the same methods for both and never need to branch on the
//! interactive flag after launch.

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::sync::watch;
use tracing::debug;

use crate::compute::ComputeSystem;

#[derive(Debug, Clone)]
pub enum Terminal {
    Console(ConsoleTerminal),
    Plain(PlainTerminal),
}

impl Terminal {
    /// Select the variant matching the interactive flag.
    pub fn for_process(
        tty: bool,
        compute: Arc<dyn ComputeSystem>,
        container_id: &str,
        pid: u32,
    ) -> Self {
        if tty {
            Terminal::Console(ConsoleTerminal::new(compute, container_id, pid))
        } else {
            Terminal::Plain(PlainTerminal)
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Terminal::Console(_))
    }

    pub async fn resize(&self, height: u16, width: u16) -> Result<()> {
        match self {
            Terminal::Console(t) => t.resize(height, width).await,
            Terminal::Plain(t) => t.resize(height, width).await,
        }
    }

    pub fn close(&self) -> Result<()> {
        match self {
            Terminal::Console(t) => t.close(),
            Terminal::Plain(t) => t.close(),
        }
    }

    /// Resolve once the terminal has been closed.
    pub async fn wait(&self) {
        match self {
            Terminal::Console(t) => t.wait().await,
            Terminal::Plain(t) => t.wait().await,
        }
    }
}

/// Console bound to one process in one container.
#[derive(Clone)]
pub struct ConsoleTerminal {
    container_id: String,
    pid: u32,
    compute: Arc<dyn ComputeSystem>,
    closed: Arc<watch::Sender<bool>>,
}

impl ConsoleTerminal {
    pub fn new(compute: Arc<dyn ComputeSystem>, container_id: &str, pid: u32) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            container_id: container_id.to_string(),
            pid,
            compute,
            closed: Arc::new(closed),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub async fn resize(&self, height: u16, width: u16) -> Result<()> {
        if self.is_closed() {
            bail!(
                "console for process {} in container {} is closed",
                self.pid,
                self.container_id
            );
        }
        self.compute
            .resize_console(&self.container_id, self.pid, height, width)
            .await
    }

    /// Mark the console closed. Closing twice is fine.
    pub fn close(&self) -> Result<()> {
        if !self.closed.send_replace(true) {
            debug!(container_id = %self.container_id, pid = self.pid, "console closed");
        }
        Ok(())
    }

    pub async fn wait(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl fmt::Debug for ConsoleTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleTerminal")
            .field("container_id", &self.container_id)
            .field("pid", &self.pid)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Pass-through terminal for processes without a console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainTerminal;

impl PlainTerminal {
    pub async fn resize(&self, _height: u16, _width: u16) -> Result<()> {
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        Ok(())
    }

    pub async fn wait(&self) {}
}
