//! End-to-end tests: feed lines to the `pipesh` binary on stdin and check
//! what the pipelines did.
//!
//! All forking happens in the spawned shell, never in the test harness.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// Run the shell in `dir` with `script` as its entire input.
fn run_in(dir: &Path, script: impl AsRef<[u8]>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pipesh"))
        .current_dir(dir)
        .env("PIPESH_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn pipesh");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_ref())
        .expect("Failed to write script");

    child.wait_with_output().expect("Failed to wait for pipesh")
}

fn run(script: impl AsRef<[u8]>) -> (TempDir, Output) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let output = run_in(dir.path(), script);
    (dir, output)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// Single stages and redirection
// ============================================================================

#[test]
fn single_command_writes_to_caller_stdout() {
    let (_dir, output) = run("echo hello world\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "hello world\n");
    assert_eq!(stderr(&output), "");
}

#[test]
fn output_then_input_redirection() {
    let (dir, output) = run("echo hi > out.txt\ncat < out.txt\n");
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hi\n");
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn output_redirection_truncates() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("out.txt"), "a much longer previous line\n").unwrap();

    run_in(dir.path(), "echo short > out.txt\n");
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "short\n");
}

#[test]
fn last_redirection_wins() {
    let (dir, output) = run("echo x > first.txt > second.txt\n");
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("second.txt")).unwrap(), "x\n");
    // the earlier target is never opened
    assert!(!dir.path().join("first.txt").exists());
}

#[test]
fn missing_input_file_kills_only_that_stage() {
    let (_dir, output) = run("cat < missing.txt\necho still here\n");
    assert!(output.status.success());
    assert!(stderr(&output).contains("pipesh: missing.txt: "), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "still here\n");
}

// ============================================================================
// Pipes
// ============================================================================

#[test]
fn two_stage_pipe() {
    let (_dir, output) = run("echo hello | tr a-z A-Z\n");
    assert_eq!(stdout(&output), "HELLO\n");
}

#[test]
fn three_stage_pipe_with_file_ends() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("words.txt"), "pear\napple\nfig\napple\n").unwrap();

    let output = run_in(dir.path(), "sort < words.txt | uniq | wc -l > count.txt\n");
    assert!(output.status.success());
    let count = fs::read_to_string(dir.path().join("count.txt")).unwrap();
    assert_eq!(count.trim(), "3");
    assert_eq!(stdout(&output), "");
}

#[test]
fn explicit_redirection_overrides_pipe() {
    // the first stage writes to a file, so the second sees an empty pipe
    let (dir, output) = run("echo side > side.txt | wc -c\n");
    assert_eq!(fs::read_to_string(dir.path().join("side.txt")).unwrap(), "side\n");
    assert_eq!(stdout(&output).trim(), "0");
}

#[test]
fn twenty_stages_run() {
    let line = format!("echo deep{}\n", " | cat".repeat(19));
    let (_dir, output) = run(&line);
    assert_eq!(stdout(&output), "deep\n");
}

#[test]
fn shell_waits_for_whole_pipeline_before_next_line() {
    let (_dir, output) = run("printf first | cat\necho second\n");
    assert_eq!(stdout(&output), "firstsecond\n");
}

#[test]
fn missing_program_does_not_stop_siblings() {
    let (_dir, output) = run("definitely-not-a-program-12345 | wc -c\necho after\n");
    assert!(output.status.success());

    let err = stderr(&output);
    assert!(
        err.contains("pipesh: definitely-not-a-program-12345: No such file or directory"),
        "stderr: {}",
        err
    );
    assert_eq!(stdout(&output), "0\nafter\n");
}

#[test]
fn argument_vector_is_passed_verbatim() {
    let (_dir, output) = run("printf %s-%s a b\n");
    assert_eq!(stdout(&output), "a-b");
}

#[test]
fn non_utf8_arguments_reach_the_program_verbatim() {
    let (_dir, output) = run(&b"printf %s caf\xe9\n"[..]);
    assert_eq!(output.stdout, b"caf\xe9");
}

#[test]
fn non_utf8_redirect_paths_are_used_verbatim() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (dir, output) = run(&b"echo hi > caf\xe9.txt\ncat < caf\xe9.txt\n"[..]);
    let path = dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
    assert_eq!(fs::read_to_string(path).unwrap(), "hi\n");
    assert_eq!(stdout(&output), "hi\n");
}

// ============================================================================
// Descriptor hygiene
// ============================================================================

/// Every stage should start with exactly fds 0, 1 and 2; `ls` opens 3 for
/// the directory it lists.
#[cfg(target_os = "linux")]
#[test]
fn stages_inherit_no_pipe_descriptors() {
    for line in [
        "ls /proc/self/fd",
        "echo x | ls /proc/self/fd",
        "ls /proc/self/fd | cat | cat",
        "echo x | ls /proc/self/fd | cat",
        "echo x | cat | ls /proc/self/fd > fds.txt",
    ] {
        let (dir, output) = run(format!("{}\n", line));
        let listing = match fs::read_to_string(dir.path().join("fds.txt")) {
            Ok(listing) => listing,
            Err(_) => stdout(&output),
        };
        assert_eq!(listing, "0\n1\n2\n3\n", "{:?}", line);
    }
}

#[test]
fn many_pipelines_in_one_session() {
    let mut script = "true | true\n".repeat(2000);
    script.push_str("echo done\n");
    let (_dir, output) = run(script);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "done\n");
    assert_eq!(stderr(&output), "");
}

// ============================================================================
// Pass-through stage
// ============================================================================

#[test]
fn pass_through_stage_to_file() {
    let (dir, output) = run("printf abc | > copy.txt\n");
    assert!(output.status.success());
    assert_eq!(fs::read(dir.path().join("copy.txt")).unwrap(), b"abc");
}

#[cfg(target_os = "linux")]
#[test]
fn pass_through_stage_to_terminal() {
    let (_dir, output) = run("printf abc | < /dev/stdin\n");
    assert_eq!(output.stdout, b"abc");
}

// ============================================================================
// Rejected lines launch nothing
// ============================================================================

#[test]
fn too_many_commands() {
    let line = format!("echo x > marker.txt{}\n", " | cat".repeat(20));
    let (dir, output) = run(&line);
    assert!(output.status.success());
    assert!(stderr(&output).contains("pipesh: Too many commands"));
    assert!(!dir.path().join("marker.txt").exists());
}

#[test]
fn too_many_arguments() {
    let (dir, output) = run("echo x > marker.txt | echo 1 2 3 4 5 6 7 8 9 10 11\n");
    assert!(stderr(&output).contains("pipesh: echo: Too many arguments"));
    assert!(!dir.path().join("marker.txt").exists());
    assert_eq!(stdout(&output), "");
}

#[test]
fn ten_arguments_are_allowed() {
    let (_dir, output) = run("echo 1 2 3 4 5 6 7 8 9 10\n");
    assert_eq!(stdout(&output), "1 2 3 4 5 6 7 8 9 10\n");
}

#[test]
fn invalid_pipes() {
    for line in ["echo x > marker.txt | | cat", "| echo x > marker.txt", "echo x > marker.txt |"] {
        let (dir, output) = run(&format!("{}\n", line));
        assert!(
            stderr(&output).contains("pipesh: Invalid pipe"),
            "{:?}: {}",
            line,
            stderr(&output)
        );
        assert!(!dir.path().join("marker.txt").exists(), "{:?}", line);
    }
}

#[test]
fn dangling_redirection() {
    let (dir, output) = run("echo x > marker.txt | cat >\n");
    assert!(stderr(&output).contains("pipesh: Syntax error"));
    assert!(!dir.path().join("marker.txt").exists());
}

#[test]
fn line_too_long_then_recovers() {
    let script = format!("echo {}\necho ok\n", "a".repeat(1100));
    let (_dir, output) = run(&script);
    assert!(stderr(&output).contains("pipesh: Command line too long"));
    assert_eq!(stdout(&output), "ok\n");
}

// ============================================================================
// Session control
// ============================================================================

#[test]
fn exit_ends_session() {
    let (_dir, output) = run("echo before\nexit\necho after\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "before\n");
}

#[test]
fn end_of_input_ends_session() {
    let (_dir, output) = run("echo last");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "last\n");
}

#[test]
fn blank_lines_are_ignored() {
    let (_dir, output) = run("\n   \n\t\necho ok\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "ok\n");
    assert_eq!(stderr(&output), "");
}
