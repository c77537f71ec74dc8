// src/host.rs

//! Wiring of the host's own stdio as caller pipes for the binary.
//!
//! Stream copies are detached from the exec call, so the binary needs its
//! own way to know when the process's output has been fully forwarded before
//! it exits. Each host writer is wrapped in a [`TrackedWriter`] holding an
//! mpsc sender; once every writer is dropped (all copy tasks finished and all
//! sink clones released) the receiver yields `None`.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::debug;

use crate::exec::{InputSource, OutputSink, Pipes};

/// `AsyncWrite` wrapper that signals the drain channel when dropped.
pub struct TrackedWriter<W> {
    inner: W,
    _alive: mpsc::Sender<()>,
}

impl<W: AsyncWrite + Unpin> AsyncWrite for TrackedWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Waits for every [`TrackedWriter`] created by [`host_pipes`] to be dropped.
pub struct OutputDrain {
    rx: mpsc::Receiver<()>,
}

impl OutputDrain {
    /// Wait until all host writers are released, or `limit` elapses.
    ///
    /// Returns `false` on timeout (e.g. a background child of the process
    /// still holds the output pipe open).
    pub async fn wait(mut self, limit: Duration) -> bool {
        match tokio::time::timeout(limit, self.rx.recv()).await {
            Ok(_) => true,
            Err(_) => {
                debug!(?limit, "output still open after process exit; not waiting further");
                false
            }
        }
    }
}

/// Caller pipes backed by the host's stdin, stdout and stderr.
///
/// Drop the returned [`Pipes`] (and every clone) before waiting on the drain.
pub fn host_pipes() -> (Pipes, OutputDrain) {
    let (tx, rx) = mpsc::channel(1);

    let pipes = Pipes::new()
        .with_stdin(InputSource::new(tokio::io::stdin()))
        .with_stdout(OutputSink::new(TrackedWriter {
            inner: tokio::io::stdout(),
            _alive: tx.clone(),
        }))
        .with_stderr(OutputSink::new(TrackedWriter {
            inner: tokio::io::stderr(),
            _alive: tx,
        }));

    (pipes, OutputDrain { rx })
}
