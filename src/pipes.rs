use std::convert::Infallible;
use std::ffi::{CString, OsStr, OsString};
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, pipe, ForkResult, Pid};

use crate::command::{Pipeline, Stage};
use crate::error::{ChildFailure, OrchestratorFailure};
use crate::redirects;

/// Both ends of one anonymous pipe. Dropping an end closes it.
pub struct Connector {
    read: OwnedFd,
    write: OwnedFd,
}

impl Connector {
    pub fn open() -> Result<Self, OrchestratorFailure> {
        let (read, write) = pipe().map_err(OrchestratorFailure::Pipe)?;
        Ok(Self { read, write })
    }
}

/// Where the next stage reads from.
pub enum Source<'a> {
    /// The caller's own input. Never closed by the pipeline.
    Caller(BorrowedFd<'a>),
    /// Read end of the previous stage's connector.
    Pipe(OwnedFd),
}

impl AsFd for Source<'_> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Source::Caller(fd) => fd.as_fd(),
            Source::Pipe(fd) => fd.as_fd(),
        }
    }
}

/// Launch every stage of `pipeline` and wait for all of them.
///
/// The first stage reads `input` and the last writes `output` unless their
/// own redirections say otherwise. The parent never holds more than one
/// connector and one source at a time: each iteration consumes the previous
/// source and hands the new read end to the next.
///
/// Exit statuses are reaped and logged, not returned.
pub fn run_pipeline(
    pipeline: &Pipeline,
    input: BorrowedFd<'_>,
    output: BorrowedFd<'_>,
) -> Result<(), OrchestratorFailure> {
    tracing::debug!(stages = pipeline.len(), %pipeline, "launching pipeline");

    let mut children = Vec::with_capacity(pipeline.len());
    let last = pipeline.len().saturating_sub(1);
    let mut source = Source::Caller(input);

    for (i, stage) in pipeline.stages().iter().enumerate() {
        match spawn_stage(stage, source, output, i == last) {
            Ok((pid, next)) => {
                tracing::trace!(stage = i, %pid, "forked");
                children.push(pid);
                source = next;
            }
            Err(failure) => {
                // our ends are already dropped, so the spawned stages can drain
                tracing::error!(stage = i, %failure, "pipeline setup failed");
                if let Err(e) = reap(&children) {
                    tracing::warn!(%e, "reaping after setup failure");
                }
                return Err(failure);
            }
        }
    }

    let reaped = reap(&children);
    drop(source);
    reaped
}

/// Fork one stage. On success returns its pid and the source for the stage
/// after it.
fn spawn_stage<'a>(
    stage: &Stage,
    source: Source<'a>,
    output: BorrowedFd<'_>,
    is_last: bool,
) -> Result<(Pid, Source<'a>), OrchestratorFailure> {
    let connector = Connector::open()?;

    // SAFETY: the shell is single threaded, so the child only inherits the
    // thread that called fork and may allocate freely before exec.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            let code = match run_child(stage, source, connector, output, is_last) {
                Ok(()) => 0,
                Err(failure) => {
                    eprintln!("pipesh: {}", failure);
                    failure.exit_code()
                }
            };
            let _ = io::stderr().flush();
            unsafe { nix::libc::_exit(code) }
        }
        Ok(ForkResult::Parent { child }) => {
            let Connector { read, write } = connector;
            drop(write);
            drop(source);
            Ok((child, Source::Pipe(read)))
        }
        Err(errno) => Err(OrchestratorFailure::Fork(errno)),
    }
}

/// Child side of a stage. Returns only for a pass-through stage or on
/// failure; a successful exec never comes back.
fn run_child(
    stage: &Stage,
    source: Source<'_>,
    connector: Connector,
    output: BorrowedFd<'_>,
    is_last: bool,
) -> Result<(), ChildFailure> {
    if is_last {
        redirects::rebind_stdout(output)?;
    } else {
        redirects::rebind_stdout(&connector.write)?;
    }
    redirects::rebind_stdin(&source)?;

    redirects::apply(stage)?;

    // everything we need now lives on fds 0 and 1
    drop(connector);
    drop(source);

    match &stage.program {
        Some(program) => match exec(program, &stage.args)? {},
        None => pass_through(),
    }
}

fn exec(program: &OsStr, args: &[OsString]) -> Result<Infallible, ChildFailure> {
    let program_c = to_cstring(program)?;
    let argv = args
        .iter()
        .map(|arg| to_cstring(arg))
        .collect::<Result<Vec<_>, _>>()?;

    match execvp(&program_c, &argv) {
        Ok(never) => match never {},
        Err(Errno::ENOENT) => Err(ChildFailure::NotFound {
            program: program.to_string_lossy().into_owned(),
        }),
        Err(errno) => Err(ChildFailure::Exec {
            program: program.to_string_lossy().into_owned(),
            errno,
        }),
    }
}

/// The bytes go to `execvp` unchanged.
fn to_cstring(arg: &OsStr) -> Result<CString, ChildFailure> {
    CString::new(arg.as_bytes()).map_err(|_| ChildFailure::NulByte {
        arg: arg.to_string_lossy().replace('\0', "\\0"),
    })
}

/// Copy fd 0 to fd 1 byte for byte until end of input.
///
/// Works on fresh duplicates of the raw descriptors so nothing the shell had
/// buffered in `io::stdin()` before the fork leaks into the output.
fn pass_through() -> Result<(), ChildFailure> {
    let stdin = io::stdin().as_fd().try_clone_to_owned();
    let stdout = io::stdout().as_fd().try_clone_to_owned();
    let mut input = File::from(stdin.map_err(ChildFailure::Copy)?);
    let mut output = File::from(stdout.map_err(ChildFailure::Copy)?);

    io::copy(&mut input, &mut output).map_err(ChildFailure::Copy)?;
    output.flush().map_err(ChildFailure::Copy)
}

/// Wait for every pid. Keeps going after a failure so no child is left
/// unreaped, then reports the first failure.
fn reap(children: &[Pid]) -> Result<(), OrchestratorFailure> {
    let mut first_failure = None;

    for &pid in children {
        match wait_for(pid) {
            Ok(status) => log_status(status),
            Err(errno) if first_failure.is_none() => {
                first_failure = Some(OrchestratorFailure::Wait { pid, errno });
            }
            Err(errno) => tracing::warn!(%pid, %errno, "waitpid failed"),
        }
    }

    match first_failure {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

fn wait_for(pid: Pid) -> Result<WaitStatus, Errno> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            other => return other,
        }
    }
}

fn log_status(status: WaitStatus) {
    match status {
        WaitStatus::Exited(pid, code) => tracing::debug!(%pid, code, "stage exited"),
        WaitStatus::Signaled(pid, signal, _) => {
            tracing::debug!(%pid, signal = signal.as_str(), "stage killed by signal")
        }
        other => tracing::debug!(status = ?other, "stage changed state"),
    }
}
