// src/exec/process.rs

use std::collections::HashMap;

use super::terminal::Terminal;

/// Description of the process to launch inside a container.
///
/// After a successful launch the driver stores the process's terminal in
/// [`ProcessConfig::terminal`]; the caller keeps using the config (and the
/// terminal) while the process runs.
#[derive(Debug, Clone, Default)]
pub struct ProcessConfig {
    pub entrypoint: String,
    pub arguments: Vec<String>,
    pub working_dir: Option<String>,
    pub env: HashMap<String, String>,
    /// Attach the process to an interactive console.
    pub tty: bool,
    pub terminal: Option<Terminal>,
}

impl ProcessConfig {
    pub fn new(entrypoint: impl Into<String>) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }
}
