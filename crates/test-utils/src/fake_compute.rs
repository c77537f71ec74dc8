// src/fake_compute.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use execdriver::compute::{
    BoxFuture, ComputeSystem, CreateProcessParams, CreatedProcess, ProcessOutput, ProcessStdin,
    StdioRequest,
};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Ordered log of what happened, shared between the fake and the test
/// (e.g. a start callback can push its own entries).
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// A call received by [`FakeComputeSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeCall {
    Create {
        env_id: String,
        stdio: StdioRequest,
        params: CreateProcessParams,
    },
    Wait {
        env_id: String,
        pid: u32,
    },
    Resize {
        env_id: String,
        pid: u32,
        height: u16,
        width: u16,
    },
}

/// A fake isolation backend that:
/// - records every call, in order
/// - simulates a few programs over in-memory pipes:
///   - `echo ARGS...` writes `ARGS\n` to stdout
///   - `cat` copies stdin to stdout
///   - `warn ARGS...` writes `ARGS\n` to stderr
///   - `exit N` exits with code `N`
///   - anything else exits immediately with the default exit code
/// - can be told to fail process creation or waiting.
#[derive(Debug)]
pub struct FakeComputeSystem {
    events: EventLog,
    calls: Mutex<Vec<ComputeCall>>,
    running: Mutex<HashMap<(String, u32), JoinHandle<i32>>>,
    next_pid: AtomicU32,
    default_exit_code: i32,
    fail_create: Option<String>,
    fail_wait: Option<String>,
}

impl Default for FakeComputeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeComputeSystem {
    pub fn new() -> Self {
        Self::with_events(EventLog::default())
    }

    pub fn with_events(events: EventLog) -> Self {
        Self {
            events,
            calls: Mutex::new(Vec::new()),
            running: Mutex::new(HashMap::new()),
            next_pid: AtomicU32::new(100),
            default_exit_code: 0,
            fail_create: None,
            fail_wait: None,
        }
    }

    pub fn failing_create(mut self, message: &str) -> Self {
        self.fail_create = Some(message.to_string());
        self
    }

    pub fn failing_wait(mut self, message: &str) -> Self {
        self.fail_wait = Some(message.to_string());
        self
    }

    pub fn default_exit_code(mut self, code: i32) -> Self {
        self.default_exit_code = code;
        self
    }

    pub fn events(&self) -> EventLog {
        self.events.clone()
    }

    pub fn calls(&self) -> Vec<ComputeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Parameters of every create call, in order.
    pub fn created(&self) -> Vec<(StdioRequest, CreateProcessParams)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ComputeCall::Create { stdio, params, .. } => Some((stdio, params)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: &str, call: ComputeCall) {
        self.events.push(event);
        self.calls.lock().unwrap().push(call);
    }

    fn start(&self, env_id: &str, stdio: StdioRequest, params: &CreateProcessParams) -> CreatedProcess {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);

        let (stdin_driver, stdin_proc) = split_pipe(stdio.stdin);
        let (stdout_proc, stdout_driver) = split_pipe(stdio.stdout);
        let (stderr_proc, stderr_driver) = split_pipe(stdio.stderr);

        let mut words = params.command_line.split_whitespace();
        let program = words.next().unwrap_or_default().to_string();
        let rest: Vec<String> = words.map(str::to_string).collect();
        let default_exit_code = self.default_exit_code;

        let handle = tokio::spawn(async move {
            simulate(program, rest, default_exit_code, stdin_proc, stdout_proc, stderr_proc).await
        });
        self.running
            .lock()
            .unwrap()
            .insert((env_id.to_string(), pid), handle);

        CreatedProcess {
            pid,
            stdin: stdin_driver.map(|s| Box::new(s) as ProcessStdin),
            stdout: stdout_driver.map(|s| Box::new(s) as ProcessOutput),
            stderr: stderr_driver.map(|s| Box::new(s) as ProcessOutput),
        }
    }
}

impl ComputeSystem for FakeComputeSystem {
    fn create_process<'a>(
        &'a self,
        env_id: &'a str,
        stdio: StdioRequest,
        params: CreateProcessParams,
    ) -> BoxFuture<'a, anyhow::Result<CreatedProcess>> {
        Box::pin(async move {
            self.record(
                "create",
                ComputeCall::Create {
                    env_id: env_id.to_string(),
                    stdio,
                    params: params.clone(),
                },
            );
            if let Some(ref message) = self.fail_create {
                bail!("{message}");
            }
            Ok(self.start(env_id, stdio, &params))
        })
    }

    fn wait_for_process<'a>(
        &'a self,
        env_id: &'a str,
        pid: u32,
    ) -> BoxFuture<'a, anyhow::Result<i32>> {
        Box::pin(async move {
            self.record(
                "wait",
                ComputeCall::Wait {
                    env_id: env_id.to_string(),
                    pid,
                },
            );
            if let Some(ref message) = self.fail_wait {
                bail!("{message}");
            }
            let handle = self
                .running
                .lock()
                .unwrap()
                .remove(&(env_id.to_string(), pid))
                .ok_or_else(|| anyhow!("no process {pid} in '{env_id}'"))?;
            Ok(handle.await?)
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
            self.record(
                "resize",
                ComputeCall::Resize {
                    env_id: env_id.to_string(),
                    pid,
                    height,
                    width,
                },
            );
            Ok(())
        })
    }
}

fn split_pipe(wanted: bool) -> (Option<DuplexStream>, Option<DuplexStream>) {
    if wanted {
        let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
        (Some(a), Some(b))
    } else {
        (None, None)
    }
}

async fn simulate(
    program: String,
    args: Vec<String>,
    default_exit_code: i32,
    stdin: Option<DuplexStream>,
    mut stdout: Option<DuplexStream>,
    mut stderr: Option<DuplexStream>,
) -> i32 {
    match program.as_str() {
        "echo" => {
            if let Some(ref mut out) = stdout {
                let _ = out.write_all(format!("{}\n", args.join(" ")).as_bytes()).await;
            }
            default_exit_code
        }
        "warn" => {
            if let Some(ref mut err) = stderr {
                let _ = err.write_all(format!("{}\n", args.join(" ")).as_bytes()).await;
            }
            default_exit_code
        }
        "cat" => {
            let mut input = Vec::new();
            if let Some(mut inp) = stdin {
                let _ = inp.read_to_end(&mut input).await;
            }
            if let Some(ref mut out) = stdout {
                let _ = out.write_all(&input).await;
            }
            default_exit_code
        }
        "exit" => args
            .first()
            .and_then(|code| code.parse().ok())
            .unwrap_or(default_exit_code),
        _ => default_exit_code,
    }
    // Dropping the pipe ends here signals EOF to the driver side.
}
