// tests/terminal.rs

use std::sync::Arc;

use execdriver::compute::ComputeSystem;
use execdriver::exec::Terminal;
use execdriver_test_utils::fake_compute::{ComputeCall, FakeComputeSystem};
use execdriver_test_utils::{init_tracing, with_timeout};

fn fake() -> (Arc<FakeComputeSystem>, Arc<dyn ComputeSystem>) {
    let fake = Arc::new(FakeComputeSystem::new());
    let compute: Arc<dyn ComputeSystem> = fake.clone();
    (fake, compute)
}

#[tokio::test]
async fn console_resize_is_scoped_to_container_and_pid() {
    init_tracing();
    let (fake, compute) = fake();

    let terminal = Terminal::for_process(true, compute, "c1", 42);
    assert!(terminal.is_interactive());
    terminal.resize(24, 80).await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![ComputeCall::Resize {
            env_id: "c1".to_string(),
            pid: 42,
            height: 24,
            width: 80,
        }]
    );
}

#[tokio::test]
async fn plain_terminal_operations_are_no_ops() {
    init_tracing();
    let (fake, compute) = fake();

    let terminal = Terminal::for_process(false, compute, "c1", 42);
    assert!(!terminal.is_interactive());
    terminal.resize(24, 80).await.unwrap();
    terminal.close().unwrap();
    with_timeout(terminal.wait()).await;

    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn closed_console_rejects_resize() {
    init_tracing();
    let (fake, compute) = fake();

    let terminal = Terminal::for_process(true, compute, "c1", 7);
    terminal.close().unwrap();
    // Closing again is harmless.
    terminal.close().unwrap();

    let err = terminal.resize(10, 10).await.unwrap_err();
    assert!(err.to_string().contains("closed"));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn console_wait_resolves_once_closed_from_a_clone() {
    init_tracing();
    let (_fake, compute) = fake();

    let terminal = Terminal::for_process(true, compute, "c1", 7);
    let closer = terminal.clone();

    let waiter = tokio::spawn(async move { terminal.wait().await });
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    closer.close().unwrap();
    with_timeout(waiter).await.unwrap();
}
