use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::path::Path;

use nix::unistd;

use crate::command::Stage;
use crate::error::ChildFailure;

/// Point fd 0 at the same open file as `fd`.
pub fn rebind_stdin<Fd: AsFd>(fd: Fd) -> Result<(), ChildFailure> {
    unistd::dup2_stdin(fd).map_err(ChildFailure::Rebind)
}

/// Point fd 1 at the same open file as `fd`.
pub fn rebind_stdout<Fd: AsFd>(fd: Fd) -> Result<(), ChildFailure> {
    unistd::dup2_stdout(fd).map_err(ChildFailure::Rebind)
}

/// Apply a stage's own `<`/`>` paths on top of whatever stdin/stdout the
/// pipeline already wired up. Only ever called in a forked child.
pub fn apply(stage: &Stage) -> Result<(), ChildFailure> {
    if let Some(path) = &stage.input {
        let file = open_input(path)?;
        rebind_stdin(&file)?;
    }

    if let Some(path) = &stage.output {
        let file = open_output(path)?;
        rebind_stdout(&file)?;
    }

    Ok(())
}

fn open_input(path: &Path) -> Result<File, ChildFailure> {
    File::open(path).map_err(|source| ChildFailure::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn open_output(path: &Path) -> Result<File, ChildFailure> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| ChildFailure::Open {
            path: path.to_path_buf(),
            source,
        })
}
