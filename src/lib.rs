// src/lib.rs

pub mod cli;
pub mod compute;
pub mod config;
pub mod errors;
pub mod exec;
pub mod host;
pub mod logging;
pub mod registry;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::compute::LocalComputeSystem;
use crate::config::{ConfigFile, load_and_validate};
use crate::exec::{ExecDriver, ProcessConfig, StartCallback, command, parse_env_entries};

/// How long to keep forwarding output after the process has exited.
const OUTPUT_DRAIN_LIMIT: Duration = Duration::from_secs(2);

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - environment registry
/// - local compute backend
/// - host stdio as caller pipes
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config from {:?}", args.config))?;

    let mut process = process_config_from_args(&args, &cfg)?;

    if args.dry_run {
        print_dry_run(&args.container, &process)?;
        return Ok(0);
    }

    let registry = cfg.registry();
    info!(environments = ?registry.ids(), "active environments");

    let compute = Arc::new(LocalComputeSystem::new(registry.clone()));
    let driver = ExecDriver::new(registry, compute);

    let (pipes, drain) = host::host_pipes();

    let container = args.container.clone();
    let on_start: StartCallback<'_> = Box::new(move |cfg: &ProcessConfig, pid: u32| {
        debug!(
            container_id = %container,
            pid,
            interactive = cfg.terminal.as_ref().is_some_and(|t| t.is_interactive()),
            "process started"
        );
    });

    let exit_code = driver
        .exec(&args.container, &mut process, pipes, Some(on_start))
        .await?;

    if let Some(terminal) = process.terminal.take() {
        terminal.close()?;
    }

    drain.wait(OUTPUT_DRAIN_LIMIT).await;
    Ok(exit_code)
}

/// Build the process description from CLI arguments.
///
/// The environment starts from the container's configured base `env` and
/// `--env` entries override it.
pub fn process_config_from_args(args: &CliArgs, cfg: &ConfigFile) -> Result<ProcessConfig> {
    let Some((entrypoint, arguments)) = args.command.split_first() else {
        bail!("no command given");
    };

    let mut env = cfg.base_env(&args.container);
    env.extend(parse_env_entries(&args.env));

    Ok(ProcessConfig {
        entrypoint: entrypoint.clone(),
        arguments: arguments.to_vec(),
        working_dir: args.workdir.clone(),
        env,
        tty: args.tty,
        terminal: None,
    })
}

/// Simple dry-run output: print what would be handed to the backend.
fn print_dry_run(container_id: &str, process: &ProcessConfig) -> Result<()> {
    let built = command::build(process)?;

    println!("execdriver dry-run");
    println!("  container: {container_id}");
    println!("  tty: {}", process.tty);
    if let Some(ref dir) = process.working_dir {
        println!("  working_dir: {dir}");
    }
    println!("  command_line: {}", built.command_line);
    println!("  environment ({}):", built.environment.len());
    for entry in &built.environment {
        println!("    {entry}");
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
