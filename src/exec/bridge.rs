// src/exec/bridge.rs

//! Stream bridging between caller pipes and process stdio handles.
//!
//! Each non-null process handle gets its own detached Tokio task that copies
//! bytes until end-of-stream or the first I/O error. Nothing is reported back
//! to the exec call: a failed copy is only visible in the logs, and the exec
//! result reflects process launch and exit, not I/O completeness.
//!
//! Caller endpoints are shared (`Arc` + async mutex) and never closed by the
//! bridge. The process's own stdin handle *is* shut down once the caller's
//! source reaches EOF, so the process sees end of input.

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::compute::{CreatedProcess, ProcessOutput, ProcessStdin, StdioRequest};
use crate::types::StreamKind;

const COPY_BUF_SIZE: usize = 8 * 1024;

/// Caller-owned source feeding a process's stdin.
#[derive(Clone)]
pub struct InputSource {
    inner: Arc<Mutex<Box<dyn AsyncRead + Send + Unpin>>>,
}

impl InputSource {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(reader))),
        }
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSource").finish_non_exhaustive()
    }
}

/// Caller-owned sink receiving a process's stdout or stderr.
///
/// The same sink may be used for both streams; writes are interleaved at
/// chunk granularity.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl OutputSink {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    async fn write_chunk(&self, chunk: &[u8]) -> std::io::Result<()> {
        let mut writer = self.inner.lock().await;
        writer.write_all(chunk).await?;
        writer.flush().await
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Optional caller endpoints for the three standard streams.
///
/// A missing endpoint means that stream is not requested from the backend
/// and not bridged.
#[derive(Debug, Clone, Default)]
pub struct Pipes {
    pub stdin: Option<InputSource>,
    pub stdout: Option<OutputSink>,
    pub stderr: Option<OutputSink>,
}

impl Pipes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdin(mut self, source: InputSource) -> Self {
        self.stdin = Some(source);
        self
    }

    pub fn with_stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = Some(sink);
        self
    }

    pub fn with_stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = Some(sink);
        self
    }

    /// Which pipes to ask the backend for.
    pub fn stdio_request(&self) -> StdioRequest {
        StdioRequest {
            stdin: self.stdin.is_some(),
            stdout: self.stdout.is_some(),
            stderr: self.stderr.is_some(),
        }
    }
}

/// Start one copy task per stdio handle present on `process`.
///
/// Handles are taken out of `process`. The returned join handles may be
/// dropped; the tasks keep running detached.
pub fn spawn_bridges(
    container_id: &str,
    process: &mut CreatedProcess,
    pipes: &Pipes,
) -> Vec<JoinHandle<()>> {
    let pid = process.pid;
    let mut tasks = Vec::new();

    if let Some(stdin) = process.stdin.take() {
        match pipes.stdin.clone() {
            Some(source) => tasks.push(spawn_stdin_copy(container_id, pid, source, stdin)),
            // Dropping the handle closes the process's stdin.
            None => debug!(container_id, pid, "no stdin source supplied; closing process stdin"),
        }
    }

    if let Some(stdout) = process.stdout.take() {
        tasks.push(spawn_output_copy(
            container_id,
            pid,
            StreamKind::Stdout,
            stdout,
            pipes.stdout.clone(),
        ));
    }

    if let Some(stderr) = process.stderr.take() {
        tasks.push(spawn_output_copy(
            container_id,
            pid,
            StreamKind::Stderr,
            stderr,
            pipes.stderr.clone(),
        ));
    }

    tasks
}

/// Copy the caller's stdin source into the process, then close the
/// process's stdin.
pub fn spawn_stdin_copy(
    container_id: &str,
    pid: u32,
    source: InputSource,
    mut stdin: ProcessStdin,
) -> JoinHandle<()> {
    let container_id = container_id.to_string();

    tokio::spawn(async move {
        let result = {
            let mut reader = source.inner.lock().await;
            tokio::io::copy(&mut *reader, &mut stdin).await
        };

        match result {
            Ok(bytes) => debug!(
                container_id = %container_id,
                pid,
                stream = %StreamKind::Stdin,
                bytes,
                "stream copy finished"
            ),
            Err(e) => warn!(
                container_id = %container_id,
                pid,
                stream = %StreamKind::Stdin,
                error = %e,
                "stream copy failed"
            ),
        }

        if let Err(e) = stdin.shutdown().await {
            debug!(
                container_id = %container_id,
                pid,
                error = %e,
                "closing process stdin failed"
            );
        }
    })
}

/// Copy a process output stream into the caller's sink.
///
/// Without a sink the stream is drained and discarded so the process never
/// blocks on a full pipe.
pub fn spawn_output_copy(
    container_id: &str,
    pid: u32,
    kind: StreamKind,
    mut output: ProcessOutput,
    sink: Option<OutputSink>,
) -> JoinHandle<()> {
    let container_id = container_id.to_string();

    tokio::spawn(async move {
        let result = match sink {
            Some(sink) => copy_chunks(&mut output, &sink).await,
            None => {
                debug!(container_id = %container_id, pid, stream = %kind, "no sink supplied; discarding output");
                tokio::io::copy(&mut output, &mut tokio::io::sink()).await
            }
        };

        match result {
            Ok(bytes) => debug!(
                container_id = %container_id,
                pid,
                stream = %kind,
                bytes,
                "stream copy finished"
            ),
            Err(e) => warn!(
                container_id = %container_id,
                pid,
                stream = %kind,
                error = %e,
                "stream copy failed"
            ),
        }
    })
}

// The sink lock is taken per chunk so stdout and stderr can share a sink
// without one copy starving the other.
async fn copy_chunks(output: &mut ProcessOutput, sink: &OutputSink) -> std::io::Result<u64> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = output.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        sink.write_chunk(&buf[..n]).await?;
        total += n as u64;
    }
}
