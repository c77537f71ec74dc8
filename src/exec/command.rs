// src/exec/command.rs

//! Turns a [`ProcessConfig`] into the command line and environment block
//! handed to the isolation backend.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::{ExecError, Result};

use super::process::ProcessConfig;

/// Concrete invocation passed to `ComputeSystem::create_process`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub command_line: String,
    /// `NAME=VALUE` entries, sorted by name.
    pub environment: Vec<String>,
}

/// Build the command line and environment block for `config`.
///
/// The command line is the entrypoint followed by each argument, joined by
/// single spaces. Arguments are **not** quoted or escaped: an argument that
/// contains spaces must already be escaped by the caller, otherwise the
/// backend will see it as several arguments.
///
/// The only validation performed is that the entrypoint is non-empty.
pub fn build(config: &ProcessConfig) -> Result<BuiltCommand> {
    if config.entrypoint.is_empty() {
        return Err(ExecError::InvalidInvocation(
            "no entrypoint specified".to_string(),
        ));
    }

    let mut command_line = config.entrypoint.clone();
    for arg in &config.arguments {
        debug!(arg = %arg, "appending argument");
        command_line.push(' ');
        command_line.push_str(arg);
    }
    debug!(command_line = %command_line, "built command line");

    Ok(BuiltCommand {
        command_line,
        environment: environment_block(&config.env),
    })
}

/// Serialize environment variables into `NAME=VALUE` entries.
///
/// Nothing from the host environment is added.
pub fn environment_block(env: &HashMap<String, String>) -> Vec<String> {
    let mut block: Vec<String> = env
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    block.sort();
    block
}

/// Parse `NAME=VALUE` entries into a map.
///
/// Each entry is split at the first `=`; an entry without `=` maps to an
/// empty value. Later entries override earlier ones with the same name.
pub fn parse_env_entries<I, S>(entries: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| {
            let entry = entry.as_ref();
            match entry.split_once('=') {
                Some((name, value)) => (name.to_string(), value.to_string()),
                None => (entry.to_string(), String::new()),
            }
        })
        .collect()
}
