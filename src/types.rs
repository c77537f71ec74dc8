// src/types.rs

use std::fmt;

/// One of the three standard streams of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdin => "stdin",
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages an exec call moves through.
///
/// `Terminated` carries the exit code; any stage may instead end in a
/// failure, which is reported through [`crate::errors::ExecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStage {
    Validating,
    EnvironmentResolved,
    ProcessCreated,
    StreamsBound,
    Started,
    Waiting,
    Terminated(i32),
}

impl fmt::Display for ExecStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecStage::Validating => f.write_str("validating"),
            ExecStage::EnvironmentResolved => f.write_str("environment-resolved"),
            ExecStage::ProcessCreated => f.write_str("process-created"),
            ExecStage::StreamsBound => f.write_str("streams-bound"),
            ExecStage::Started => f.write_str("started"),
            ExecStage::Waiting => f.write_str("waiting"),
            ExecStage::Terminated(code) => write!(f, "terminated({code})"),
        }
    }
}
