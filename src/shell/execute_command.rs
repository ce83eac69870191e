//! Fork/exec of external commands.
//!
//! Everything the child needs (argv and its pointer array, paths,
//! diagnostics) is built before forking. Between `fork` and `exec` the child
//! only makes async-signal-safe calls and never allocates.

use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::ptr;
use std::thread;
use std::time::Duration;

use nix::{
    errno::Errno,
    fcntl::{self, OFlag},
    libc,
    sys::{stat::Mode, wait},
    unistd::{self, ForkResult, Pid},
};

use crate::{
    core::{job::Status, parser::ast::SimpleCommand},
    errors::{Error, ErrorKind, Result, ResultExt},
    shell::signals,
};

/// Exit status of a child that could not open a redirect target.
pub const REDIRECT_OPEN_FAILURE_EXIT_STATUS: i32 = 1;
/// Exit status of a child that could not duplicate a redirect target.
pub const REDIRECT_DUP_FAILURE_EXIT_STATUS: i32 = 2;
/// Exit status of a child whose `execvp` failed.
pub const COMMAND_NOT_FOUND_EXIT_STATUS: i32 = 1;
/// Exit status of a child that could not reset its signal dispositions.
pub const SIGNAL_SETUP_FAILURE_EXIT_STATUS: i32 = 1;

const SIGNAL_SETUP_FAILED: &[u8] = b"smallsh: failed to reset signal dispositions\n";

const REDIRECT_FILE_MODE: libc::mode_t = 0o666;

/// Retry policy for `fork` failing with a transient error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForkPolicy {
    /// Retries after the first failed attempt.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for ForkPolicy {
    fn default() -> Self {
        Self {
            retries: 45,
            delay: Duration::from_secs(1),
        }
    }
}

/// Result of launching an external command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Spawned {
    /// Running in the background; the caller must track it.
    Background(Pid),
    /// Ran in the foreground to completion.
    Foreground(Status),
}

struct Redirect {
    path: CString,
    open_failed: Vec<u8>,
    dup_failed: Vec<u8>,
}

impl Redirect {
    fn new(path: &str, direction: &str) -> Result<Self> {
        Ok(Self {
            path: to_cstring(path)?,
            open_failed: format!("cannot open {} for {}\n", path, direction).into_bytes(),
            dup_failed: format!("{}: failed to redirect {}\n", path, direction).into_bytes(),
        })
    }
}

/// A command converted to the form `execvp` consumes.
struct PreparedCommand {
    /// Owns the strings `argv_ptrs` points into.
    argv: Vec<CString>,
    /// NULL-terminated.
    argv_ptrs: Vec<*const libc::c_char>,
    input: Option<Redirect>,
    output: Option<Redirect>,
    exec_failed: Vec<u8>,
}

impl PreparedCommand {
    fn new(command: &SimpleCommand) -> Result<Self> {
        let argv: Vec<CString> = command.argv().map(to_cstring).collect::<Result<_>>()?;
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(Some(ptr::null()))
            .collect();
        Ok(Self {
            argv,
            argv_ptrs,
            input: command
                .input
                .as_ref()
                .map(|path| Redirect::new(path, "input"))
                .transpose()?,
            output: command
                .output
                .as_ref()
                .map(|path| Redirect::new(path, "output"))
                .transpose()?,
            exec_failed: format!("{}: no such file or directory\n", command.name).into_bytes(),
        })
    }
}

fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::invalid_argument(s))
}

/// A requested background run is honored unless foreground-only mode is on.
pub fn runs_in_background(command: &SimpleCommand, foreground_only: bool) -> bool {
    command.background && !foreground_only
}

/// Forks and execs `command`, waiting for it unless it runs in the background.
pub fn spawn_process(
    command: &SimpleCommand,
    foreground_only: bool,
    policy: &ForkPolicy,
) -> Result<Spawned> {
    let prepared = PreparedCommand::new(command)?;
    let background = runs_in_background(command, foreground_only);
    if command.background && !background {
        debug!("foreground-only mode: running '{}' in the foreground", command);
    }

    match fork_with_retry(policy, || unsafe { unistd::fork() })? {
        ForkResult::Child => exec_child(&prepared, !background),
        ForkResult::Parent { child } => {
            debug!("forked pid {} for '{}'", child, command);
            if background {
                Ok(Spawned::Background(child))
            } else {
                wait_for_process(child).map(Spawned::Foreground)
            }
        }
    }
}

/// Calls `fork` until it succeeds, retrying transient failures per `policy`.
pub fn fork_with_retry<T, F>(policy: &ForkPolicy, mut fork: F) -> Result<T>
where
    F: FnMut() -> nix::Result<T>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match fork() {
            Ok(result) => return Ok(result),
            Err(e @ Errno::EAGAIN) | Err(e @ Errno::ENOMEM) => {
                if attempts > policy.retries {
                    error!("fork failed {} times, giving up: {}", attempts, e);
                    return Err(ErrorKind::ForkFailed(attempts).into());
                }
                warn!("fork: retry: {} (attempt {})", e, attempts);
                thread::sleep(policy.delay);
            }
            Err(e) => return Err(e).chain_err(|| "fork failed"),
        }
    }
}

/// Blocks until `pid` exits or is killed by a signal.
fn wait_for_process(pid: Pid) -> Result<Status> {
    loop {
        match wait::waitpid(pid, None) {
            Ok(wait_status) => {
                if let Some(status) = Status::from_wait_status(wait_status) {
                    return Ok(status);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e).chain_err(|| format!("waitpid({}) failed", pid)),
        }
    }
}

fn exec_child(prepared: &PreparedCommand, foreground: bool) -> ! {
    if signals::prepare_child(foreground).is_err() {
        child_exit(SIGNAL_SETUP_FAILED, SIGNAL_SETUP_FAILURE_EXIT_STATUS);
    }

    if let Some(ref input) = prepared.input {
        redirect(input, OFlag::O_RDONLY, libc::STDIN_FILENO);
    }
    if let Some(ref output) = prepared.output {
        redirect(
            output,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            libc::STDOUT_FILENO,
        );
    }

    // only returns on failure
    unsafe {
        libc::execvp(prepared.argv[0].as_ptr(), prepared.argv_ptrs.as_ptr());
    }
    child_exit(&prepared.exec_failed, COMMAND_NOT_FOUND_EXIT_STATUS)
}

fn redirect(redirect: &Redirect, flags: OFlag, target: RawFd) {
    let mode = Mode::from_bits_truncate(REDIRECT_FILE_MODE);
    let fd = match fcntl::open(redirect.path.as_c_str(), flags, mode) {
        Ok(fd) => fd,
        Err(_) => child_exit(&redirect.open_failed, REDIRECT_OPEN_FAILURE_EXIT_STATUS),
    };
    if fd != target {
        if unistd::dup2(fd, target).is_err() {
            child_exit(&redirect.dup_failed, REDIRECT_DUP_FAILURE_EXIT_STATUS);
        }
        let _ = unistd::close(fd);
    }
}

fn child_exit(message: &[u8], code: i32) -> ! {
    let _ = unistd::write(libc::STDERR_FILENO, message);
    unsafe { libc::_exit(code) }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::fs;

    use nix::sys::signal::Signal;
    use tempdir::TempDir;

    fn run(command: &SimpleCommand) -> Spawned {
        spawn_process(command, false /* foreground_only */, &ForkPolicy::default())
            .expect("spawn_process failed")
    }

    fn no_delay(retries: u32) -> ForkPolicy {
        ForkPolicy {
            retries,
            delay: Duration::from_millis(0),
        }
    }

    #[test]
    fn test_runs_in_background() {
        let command = SimpleCommand::new("sleep").args(vec!["5"]).background(true);
        assert!(runs_in_background(&command, false));
        assert!(!runs_in_background(&command, true));
        let command = command.background(false);
        assert!(!runs_in_background(&command, false));
        assert!(!runs_in_background(&command, true));
    }

    #[test]
    fn test_foreground_exit_codes() {
        assert_eq!(
            run(&SimpleCommand::new("true")),
            Spawned::Foreground(Status::Exited(0))
        );
        assert_eq!(
            run(&SimpleCommand::new("false")),
            Spawned::Foreground(Status::Exited(1))
        );
        assert_eq!(
            run(&SimpleCommand::new("sh").args(vec!["-c", "exit 7"])),
            Spawned::Foreground(Status::Exited(7))
        );
    }

    #[test]
    fn test_foreground_terminated_by_signal() {
        assert_eq!(
            run(&SimpleCommand::new("sh").args(vec!["-c", "kill -TERM $$"])),
            Spawned::Foreground(Status::Signaled(Signal::SIGTERM))
        );
    }

    #[test]
    fn test_command_not_found_exits_with_one() {
        assert_eq!(
            run(&SimpleCommand::new("smallsh-test-no-such-command")),
            Spawned::Foreground(Status::Exited(COMMAND_NOT_FOUND_EXIT_STATUS))
        );
    }

    #[test]
    fn test_redirects() {
        let temp_dir = TempDir::new("smallsh").unwrap();
        let input = temp_dir.path().join("in.txt");
        let output = temp_dir.path().join("out.txt");
        fs::write(&input, "banana\napple\n").unwrap();
        fs::write(&output, "stale contents that must be truncated\n").unwrap();

        let command = SimpleCommand::new("sort")
            .input(input.to_str().unwrap())
            .output(output.to_str().unwrap());
        assert_eq!(run(&command), Spawned::Foreground(Status::Exited(0)));
        assert_eq!(fs::read_to_string(&output).unwrap(), "apple\nbanana\n");
    }

    #[test]
    fn test_missing_input_fails_only_the_child() {
        let temp_dir = TempDir::new("smallsh").unwrap();
        let command = SimpleCommand::new("cat")
            .input(temp_dir.path().join("missing").to_str().unwrap());
        assert_eq!(
            run(&command),
            Spawned::Foreground(Status::Exited(REDIRECT_OPEN_FAILURE_EXIT_STATUS))
        );
    }

    #[test]
    fn test_unwritable_output_fails_only_the_child() {
        let temp_dir = TempDir::new("smallsh").unwrap();
        let command = SimpleCommand::new("echo")
            .output(temp_dir.path().join("no/such/dir/out").to_str().unwrap());
        assert_eq!(
            run(&command),
            Spawned::Foreground(Status::Exited(REDIRECT_OPEN_FAILURE_EXIT_STATUS))
        );
    }

    #[test]
    fn test_background_returns_immediately() {
        let command = SimpleCommand::new("sleep").args(vec!["30"]).background(true);
        let pid = match run(&command) {
            Spawned::Background(pid) => pid,
            other => panic!("expected background run, got {:?}", other),
        };
        nix::sys::signal::kill(pid, Signal::SIGKILL).unwrap();
        let _ = wait::waitpid(pid, None);
    }

    #[test]
    fn test_ampersand_is_not_passed_to_program() {
        let temp_dir = TempDir::new("smallsh").unwrap();
        let output = temp_dir.path().join("argv.txt");
        let command = SimpleCommand::new("echo")
            .args(vec!["hello"])
            .output(output.to_str().unwrap())
            .background(true);
        // foreground-only mode makes this wait, so the output is complete
        let spawned = spawn_process(&command, true, &ForkPolicy::default()).unwrap();
        assert_eq!(spawned, Spawned::Foreground(Status::Exited(0)));
        assert_eq!(fs::read_to_string(&output).unwrap(), "hello\n");
    }

    #[test]
    fn test_prepared_argv_is_null_terminated() {
        let command = SimpleCommand::new("ls").args(vec!["-l", "/tmp"]).background(true);
        let prepared = PreparedCommand::new(&command).unwrap();
        assert_eq!(prepared.argv_ptrs.len(), prepared.argv.len() + 1);
        assert!(prepared.argv_ptrs[3].is_null());
        for (arg, &ptr) in prepared.argv.iter().zip(&prepared.argv_ptrs) {
            assert_eq!(arg.as_ptr(), ptr);
        }
        let args = prepared
            .argv
            .iter()
            .map(|arg| arg.to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(args, vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn test_interior_nul_is_rejected_before_fork() {
        let command = SimpleCommand::new("echo").args(vec!["a\0b"]);
        let err = spawn_process(&command, false, &ForkPolicy::default()).unwrap_err();
        match *err.kind() {
            ErrorKind::InvalidArgument(ref arg) => assert_eq!(arg, "a\0b"),
            ref other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_fork_retry_recovers() {
        let calls = Cell::new(0);
        let result = fork_with_retry(&no_delay(45), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Errno::EAGAIN)
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_fork_retry_is_bounded() {
        let calls = Cell::new(0);
        let result: Result<()> = fork_with_retry(&no_delay(45), || {
            calls.set(calls.get() + 1);
            Err(Errno::EAGAIN)
        });
        assert_eq!(calls.get(), 46);
        match *result.unwrap_err().kind() {
            ErrorKind::ForkFailed(attempts) => assert_eq!(attempts, 46),
            ref other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_fork_non_transient_error_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = fork_with_retry(&no_delay(45), || {
            calls.set(calls.get() + 1);
            Err(Errno::EPERM)
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
