// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`driver`] owns the exec operation and sequences the other pieces.
//! - [`command`] builds the command line and environment block.
//! - [`process`] describes the process to launch.
//! - [`bridge`] copies bytes between caller pipes and process stdio.
//! - [`terminal`] exposes console control uniformly for interactive and
//!   plain processes.

pub mod bridge;
pub mod command;
pub mod driver;
pub mod process;
pub mod terminal;

pub use bridge::{InputSource, OutputSink, Pipes};
pub use command::{BuiltCommand, parse_env_entries};
pub use driver::{ExecDriver, StartCallback};
pub use process::ProcessConfig;
pub use terminal::{ConsoleTerminal, PlainTerminal, Terminal};
