use std::fmt;

use nix::{sys::signal::Signal, sys::wait::WaitStatus, unistd::Pid};

/// How a child process finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Exited(i32),
    Signaled(Signal),
}

impl Status {
    pub fn success() -> Self {
        Status::Exited(0)
    }

    /// Converts a terminal `WaitStatus`; `None` if the child has not finished.
    pub fn from_wait_status(wait_status: WaitStatus) -> Option<Self> {
        match wait_status {
            WaitStatus::Exited(_, code) => Some(Status::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Status::Signaled(signal)),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Exited(0)
    }

    /// Exit code a shell reports for this status: the code itself, or 128
    /// plus the signal number.
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Exited(code) => code,
            Status::Signaled(signal) => 128 + signal as i32,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::success()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Status::Exited(code) => write!(f, "exit value {}", code),
            Status::Signaled(signal) => write!(f, "terminated by signal {}", signal as i32),
        }
    }
}

/// A background child tracked until it is reaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pid: Pid,
    input: String,
}

impl Job {
    pub fn new(pid: Pid, input: &str) -> Self {
        Self {
            pid,
            input: input.to_string(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The command line that started this job.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pid, self.input)
    }
}

/// A background job that has finished, as reported by a reap pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reaped {
    pub job: Job,
    pub status: Status,
}

impl fmt::Display for Reaped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Exited(code) => write!(
                f,
                "background pid {} is done: exit value {}",
                self.job.pid, code
            ),
            Status::Signaled(signal) => write!(
                f,
                "background pid {} is done: terminated by signal {}",
                self.job.pid, signal as i32
            ),
        }
    }
}
