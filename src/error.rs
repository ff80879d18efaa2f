use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

/// Problems with the line itself. The line is dropped and the prompt comes back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid pipe")]
    InvalidPipe,
    #[error("Too many commands")]
    TooManyCommands,
    #[error("{program}: Too many arguments")]
    TooManyArguments { program: String },
    #[error("Syntax error")]
    Syntax,
    #[error("Command line too long")]
    LineTooLong,
}

/// Failures inside a forked stage. They end that child and nothing else.
#[derive(Debug, Error)]
pub enum ChildFailure {
    #[error("{}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("dup2: {0}")]
    Rebind(#[source] Errno),
    #[error("{program}: No such file or directory")]
    NotFound { program: String },
    #[error("{program}: {errno}")]
    Exec { program: String, errno: Errno },
    #[error("{arg}: argument contains a nul byte")]
    NulByte { arg: String },
    #[error("pass-through: {0}")]
    Copy(#[source] io::Error),
}

impl ChildFailure {
    /// Status the child exits with after reporting the failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ChildFailure::NotFound { .. } => 127,
            ChildFailure::Exec { .. } => 126,
            _ => 1,
        }
    }
}

/// Failures in the shell process while setting up or draining a pipeline.
#[derive(Debug, Error)]
pub enum OrchestratorFailure {
    #[error("pipe: {0}")]
    Pipe(#[source] Errno),
    #[error("fork: {0}")]
    Fork(#[source] Errno),
    #[error("waitpid {pid}: {errno}")]
    Wait { pid: Pid, errno: Errno },
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorFailure),
    #[error("reading input: {0}")]
    Input(#[from] io::Error),
}
