// tests/exec_driver.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use execdriver::compute::StdioRequest;
use execdriver::errors::ExecError;
use execdriver::exec::{
    ExecDriver, InputSource, OutputSink, Pipes, ProcessConfig, StartCallback, Terminal,
};
use execdriver_test_utils::builders::registry_with;
use execdriver_test_utils::fake_compute::{ComputeCall, EventLog, FakeComputeSystem};
use execdriver_test_utils::memory::{BrokenSink, MemorySink};
use execdriver_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn driver_with(fake: FakeComputeSystem) -> (ExecDriver, Arc<FakeComputeSystem>) {
    let fake = Arc::new(fake);
    let driver = ExecDriver::new(registry_with(&["c1"]), fake.clone());
    (driver, fake)
}

fn waited_pid(fake: &FakeComputeSystem) -> u32 {
    fake.calls()
        .iter()
        .find_map(|call| match call {
            ComputeCall::Wait { pid, .. } => Some(*pid),
            _ => None,
        })
        .expect("wait call recorded")
}

fn stdout_pipes(sink: &MemorySink) -> Pipes {
    Pipes::new().with_stdout(OutputSink::new(sink.clone()))
}

#[tokio::test]
async fn echo_in_active_container_returns_zero_and_streams_stdout() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());
    let stdout = MemorySink::new();

    let mut config = ProcessConfig::new("echo").arg("hi");
    let code = with_timeout(driver.exec("c1", &mut config, stdout_pipes(&stdout), None)).await?;

    assert_eq!(code, 0);
    assert_eq!(stdout.wait_for(b"hi\n").await, b"hi\n");
    Ok(())
}

#[tokio::test]
async fn empty_entrypoint_is_rejected_before_anything_else() {
    init_tracing();
    let (driver, fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("");
    let err = driver
        .exec("c1", &mut config, Pipes::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::InvalidInvocation(_)), "got {err:?}");
    assert_eq!(err.exit_code(), -1);
    assert!(fake.calls().is_empty());
    assert!(config.terminal.is_none());
}

#[tokio::test]
async fn empty_entrypoint_wins_over_unknown_container() {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("");
    let err = driver
        .exec("missing", &mut config, Pipes::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::InvalidInvocation(_)), "got {err:?}");
}

#[tokio::test]
async fn unknown_container_fails_without_creating_a_process() {
    init_tracing();
    let (driver, fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("echo").arg("hi");
    let err = driver
        .exec("nope", &mut config, Pipes::new(), None)
        .await
        .unwrap_err();

    match err {
        ExecError::EnvironmentNotFound { ref container_id } => assert_eq!(container_id, "nope"),
        ref other => panic!("expected EnvironmentNotFound, got {other:?}"),
    }
    assert_eq!(err.exit_code(), -1);
    assert!(err.to_string().contains("nope"));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn create_receives_built_invocation() -> TestResult {
    init_tracing();
    let (driver, fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("app")
        .args(["--flag", "val"])
        .working_dir("/work")
        .env_var("B", "2")
        .env_var("A", "1")
        .tty(true);
    let pipes = Pipes::new()
        .with_stdin(InputSource::new(tokio::io::empty()))
        .with_stdout(OutputSink::new(MemorySink::new()));

    with_timeout(driver.exec("c1", &mut config, pipes, None)).await?;

    let created = fake.created();
    assert_eq!(created.len(), 1);
    let (stdio, params) = &created[0];
    assert_eq!(
        *stdio,
        StdioRequest {
            stdin: true,
            stdout: true,
            stderr: false,
        }
    );
    assert_eq!(params.command_line, "app --flag val");
    assert!(params.emulate_console);
    assert_eq!(params.working_directory.as_deref(), Some("/work"));
    assert_eq!(params.environment, vec!["A=1".to_string(), "B=2".to_string()]);
    Ok(())
}

#[tokio::test]
async fn non_interactive_exec_attaches_plain_terminal() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("true");
    with_timeout(driver.exec("c1", &mut config, Pipes::new(), None)).await?;

    let terminal = config.terminal.expect("terminal attached");
    assert!(matches!(terminal, Terminal::Plain(_)));
    assert!(!terminal.is_interactive());
    Ok(())
}

#[tokio::test]
async fn interactive_exec_attaches_console_bound_to_process() -> TestResult {
    init_tracing();
    let (driver, fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("true").tty(true);
    with_timeout(driver.exec("c1", &mut config, Pipes::new(), None)).await?;

    let pid = waited_pid(&fake);

    match config.terminal {
        Some(Terminal::Console(ref console)) => {
            assert_eq!(console.container_id(), "c1");
            assert_eq!(console.pid(), pid);
        }
        ref other => panic!("expected console terminal, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn start_callback_fires_once_with_pid_before_wait() -> TestResult {
    init_tracing();
    let events = EventLog::default();
    let (driver, fake) = driver_with(FakeComputeSystem::with_events(events.clone()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let callback: StartCallback<'_> = {
        let seen = seen.clone();
        let events = events.clone();
        Box::new(move |cfg: &ProcessConfig, pid: u32| {
            events.push("callback");
            seen.lock()
                .unwrap()
                .push((pid, cfg.terminal.is_some()));
        })
    };

    let mut config = ProcessConfig::new("echo").arg("hi");
    with_timeout(driver.exec("c1", &mut config, Pipes::new(), Some(callback))).await?;

    assert_eq!(events.snapshot(), vec!["create", "callback", "wait"]);

    let waited_pid = waited_pid(&fake);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(waited_pid, true)]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn streams_are_live_before_start_callback_returns() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());
    let stdout = MemorySink::new();

    // The callback blocks the test thread; only already-running copy tasks
    // on the workers can deliver the output meanwhile.
    let seen_in_callback = Arc::new(Mutex::new(Vec::new()));
    let callback: StartCallback<'_> = {
        let stdout = stdout.clone();
        let seen_in_callback = seen_in_callback.clone();
        Box::new(move |_: &ProcessConfig, _: u32| {
            let deadline = std::time::Instant::now() + std::time::Duration::from_secs(1);
            while stdout.contents() != b"hi\n" && std::time::Instant::now() < deadline {
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            *seen_in_callback.lock().unwrap() = stdout.contents();
        })
    };

    let mut config = ProcessConfig::new("echo").arg("hi");
    let code = with_timeout(driver.exec(
        "c1",
        &mut config,
        stdout_pipes(&stdout),
        Some(callback),
    ))
    .await?;

    assert_eq!(code, 0);
    assert_eq!(*seen_in_callback.lock().unwrap(), b"hi\n");
    Ok(())
}

#[tokio::test]
async fn creation_failure_skips_streams_and_callback() {
    init_tracing();
    let events = EventLog::default();
    let fake = FakeComputeSystem::with_events(events.clone()).failing_create("out of handles");
    let (driver, _fake) = driver_with(fake);
    let stdout = MemorySink::new();

    let fired = Arc::new(Mutex::new(false));
    let callback: StartCallback<'_> = {
        let fired = fired.clone();
        Box::new(move |_: &ProcessConfig, _: u32| *fired.lock().unwrap() = true)
    };

    let mut config = ProcessConfig::new("echo").arg("hi");
    let err = driver
        .exec("c1", &mut config, stdout_pipes(&stdout), Some(callback))
        .await
        .unwrap_err();

    match err {
        ExecError::ProcessCreationFailed { ref container_id, ref source } => {
            assert_eq!(container_id, "c1");
            assert!(source.to_string().contains("out of handles"));
        }
        ref other => panic!("expected ProcessCreationFailed, got {other:?}"),
    }
    assert_eq!(err.exit_code(), -1);
    assert!(!*fired.lock().unwrap());
    assert_eq!(events.snapshot(), vec!["create"]);
    assert!(config.terminal.is_none());
    assert!(stdout.contents().is_empty());
}

#[tokio::test]
async fn wait_failure_is_reported_after_streams_were_bridged() {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new().failing_wait("container torn down"));
    let stdout = MemorySink::new();

    let mut config = ProcessConfig::new("echo").arg("still").arg("here");
    let err = with_timeout(driver.exec("c1", &mut config, stdout_pipes(&stdout), None))
        .await
        .unwrap_err();

    match err {
        ExecError::WaitFailed { ref container_id, ref source, .. } => {
            assert_eq!(container_id, "c1");
            assert!(source.to_string().contains("container torn down"));
        }
        ref other => panic!("expected WaitFailed, got {other:?}"),
    }
    assert_eq!(err.exit_code(), -1);
    assert!(config.terminal.is_some());
    assert_eq!(stdout.wait_for(b"still here\n").await, b"still here\n");
}

#[tokio::test]
async fn nonzero_exit_code_is_returned_as_is() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("exit").arg("3");
    let code = with_timeout(driver.exec("c1", &mut config, Pipes::new(), None)).await?;

    assert_eq!(code, 3);
    Ok(())
}

#[tokio::test]
async fn stdin_is_bridged_into_the_process() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());
    let stdout = MemorySink::new();

    let pipes = Pipes::new()
        .with_stdin(InputSource::new(&b"line one\nline two\n"[..]))
        .with_stdout(OutputSink::new(stdout.clone()));

    let mut config = ProcessConfig::new("cat");
    let code = with_timeout(driver.exec("c1", &mut config, pipes, None)).await?;

    assert_eq!(code, 0);
    assert_eq!(
        stdout.wait_for(b"line one\nline two\n").await,
        b"line one\nline two\n"
    );
    Ok(())
}

#[tokio::test]
async fn stderr_goes_to_its_own_sink() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());
    let stdout = MemorySink::new();
    let stderr = MemorySink::new();

    let pipes = Pipes::new()
        .with_stdout(OutputSink::new(stdout.clone()))
        .with_stderr(OutputSink::new(stderr.clone()));

    let mut config = ProcessConfig::new("warn").arg("oops");
    with_timeout(driver.exec("c1", &mut config, pipes, None)).await?;

    assert_eq!(stderr.wait_for(b"oops\n").await, b"oops\n");
    assert!(stdout.contents().is_empty());
    Ok(())
}

#[tokio::test]
async fn stream_copy_failure_does_not_change_exit_code() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new().default_exit_code(0));

    let pipes = Pipes::new().with_stdout(OutputSink::new(BrokenSink));
    let mut config = ProcessConfig::new("echo").arg("lost");
    let code = with_timeout(driver.exec("c1", &mut config, pipes, None)).await?;

    assert_eq!(code, 0);
    Ok(())
}

#[tokio::test]
async fn unrequested_streams_are_not_asked_for() -> TestResult {
    init_tracing();
    let (driver, fake) = driver_with(FakeComputeSystem::new());

    let mut config = ProcessConfig::new("echo").arg("nobody listens");
    let code = with_timeout(driver.exec("c1", &mut config, Pipes::new(), None)).await?;

    assert_eq!(code, 0);
    let (stdio, _) = fake.created().remove(0);
    assert_eq!(stdio, StdioRequest::default());
    Ok(())
}

#[tokio::test]
async fn concurrent_execs_in_the_same_container_are_independent() -> TestResult {
    init_tracing();
    let (driver, _fake) = driver_with(FakeComputeSystem::new());

    let first = MemorySink::new();
    let second = MemorySink::new();

    let mut a = ProcessConfig::new("echo").arg("first");
    let mut b = ProcessConfig::new("exit").arg("7");
    let (ra, rb) = with_timeout(async {
        tokio::join!(
            driver.exec("c1", &mut a, stdout_pipes(&first), None),
            driver.exec("c1", &mut b, stdout_pipes(&second), None),
        )
    })
    .await;

    assert_eq!(ra?, 0);
    assert_eq!(rb?, 7);
    assert_eq!(first.wait_for(b"first\n").await, b"first\n");
    assert!(second.contents().is_empty());
    Ok(())
}
