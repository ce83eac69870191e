//! Background job bookkeeping.

use std::fmt;

use nix::{
    errno::Errno,
    sys::{
        signal::{self, Signal},
        wait::{self, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};

use crate::core::job::{Job, Reaped, Status};

/// Background jobs that have been started but not yet reaped.
///
/// Only the main thread of control touches the table: registration after a
/// background fork, the reap pass before each line, and shutdown on exit.
#[derive(Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    /// Starts tracking `pid`. A pid that is already tracked is kept once.
    pub fn register(&mut self, pid: Pid, input: &str) {
        if self.contains(pid) {
            warn!("pid {} is already tracked", pid);
            return;
        }
        debug!("tracking background pid {}", pid);
        self.jobs.push(Job::new(pid, input));
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.iter().any(|job| job.pid() == pid)
    }

    pub fn has_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Checks every job without blocking, removing and returning the ones
    /// that have terminated. Each termination is reported exactly once.
    pub fn reap_and_remove(&mut self) -> Vec<Reaped> {
        let mut reaped = Vec::new();
        self.jobs.retain(|job| match try_wait(job.pid()) {
            Ok(Some(status)) => {
                debug!("reaped background pid {}: {}", job.pid(), status);
                reaped.push(Reaped {
                    job: job.clone(),
                    status,
                });
                false
            }
            Ok(None) => true,
            Err(Errno::ECHILD) => {
                warn!("background pid {} is no longer our child", job.pid());
                false
            }
            Err(e) => {
                error!("waitpid({}) failed: {}", job.pid(), e);
                true
            }
        });
        reaped
    }

    /// Sends SIGTERM to every job and stops tracking all of them.
    pub fn shutdown_all(&mut self) {
        for job in self.jobs.drain(..) {
            match signal::kill(job.pid(), Signal::SIGTERM) {
                Ok(()) => debug!("sent SIGTERM to background pid {}", job.pid()),
                Err(Errno::ESRCH) => debug!("background pid {} already exited", job.pid()),
                Err(e) => error!("failed to signal background pid {}: {}", job.pid(), e),
            }
        }
    }
}

fn try_wait(pid: Pid) -> nix::Result<Option<Status>> {
    loop {
        match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return Ok(None),
            Ok(wait_status) => {
                if let Some(status) = Status::from_wait_status(wait_status) {
                    return Ok(Some(status));
                }
                // stopped or continued; still alive
                return Ok(None);
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

impl fmt::Debug for JobTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} jobs", self.jobs.len())?;
        for job in &self.jobs {
            writeln!(f, "{}", job)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::process::{Child, Command};
    use std::thread;
    use std::time::{Duration, Instant};

    fn spawn(program: &str, args: &[&str]) -> (Child, Pid) {
        let child = Command::new(program)
            .args(args)
            .spawn()
            .expect("failed to spawn test child");
        let pid = Pid::from_raw(child.id() as i32);
        (child, pid)
    }

    /// Runs reap passes until `pred` holds or a deadline passes.
    fn reap_until<F>(table: &mut JobTable, mut pred: F) -> Vec<Reaped>
    where
        F: FnMut(&[Reaped]) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut reaped = Vec::new();
        while Instant::now() < deadline {
            reaped.extend(table.reap_and_remove());
            if pred(&reaped) {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        reaped
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut table = JobTable::default();
        let pid = Pid::from_raw(999_999);
        table.register(pid, "sleep 1 &");
        table.register(pid, "sleep 1 &");
        assert_eq!(table.len(), 1);
        assert!(table.contains(pid));
    }

    #[test]
    fn test_reap_does_not_block_on_running_jobs() {
        let mut table = JobTable::default();
        let (_child, pid) = spawn("sleep", &["30"]);
        table.register(pid, "sleep 30 &");

        let start = Instant::now();
        assert!(table.reap_and_remove().is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(table.contains(pid));

        table.shutdown_all();
        assert!(!table.has_jobs());
        let _ = wait::waitpid(pid, None);
    }

    #[test]
    fn test_reap_removes_only_terminated_job() {
        let mut table = JobTable::default();
        let (_c1, p1) = spawn("sleep", &["30"]);
        let (_c2, p2) = spawn("sleep", &["30"]);
        let (_c3, p3) = spawn("sleep", &["30"]);
        table.register(p1, "sleep 30 &");
        table.register(p2, "sleep 30 &");
        table.register(p3, "sleep 30 &");

        signal::kill(p2, Signal::SIGKILL).unwrap();
        let reaped = reap_until(&mut table, |r| !r.is_empty());

        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].job.pid(), p2);
        assert_eq!(reaped[0].status, Status::Signaled(Signal::SIGKILL));
        let remaining = table.jobs().iter().map(Job::pid).collect::<Vec<_>>();
        assert_eq!(remaining, vec![p1, p3]);

        // reported once
        assert!(table.reap_and_remove().is_empty());

        table.shutdown_all();
        let _ = wait::waitpid(p1, None);
        let _ = wait::waitpid(p3, None);
    }

    #[test]
    fn test_reap_reports_exit_code() {
        let mut table = JobTable::default();
        let (_child, pid) = spawn("sh", &["-c", "exit 3"]);
        table.register(pid, "sh -c 'exit 3' &");

        let reaped = reap_until(&mut table, |r| !r.is_empty());
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].status, Status::Exited(3));
        assert!(!table.has_jobs());
    }

    #[test]
    fn test_reap_drops_pid_that_is_not_a_child() {
        let mut table = JobTable::default();
        // pid 1 is never our child
        table.register(Pid::from_raw(1), "init");
        assert!(table.reap_and_remove().is_empty());
        assert!(!table.has_jobs());
    }

    #[test]
    fn test_shutdown_terminates_jobs() {
        let mut table = JobTable::default();
        let (_child, pid) = spawn("sleep", &["30"]);
        table.register(pid, "sleep 30 &");
        table.shutdown_all();
        assert!(!table.has_jobs());
        assert_eq!(
            wait::waitpid(pid, None).unwrap(),
            WaitStatus::Signaled(pid, Signal::SIGTERM, false)
        );
    }

    #[test]
    fn test_shutdown_tolerates_dead_pids() {
        let mut table = JobTable::default();
        let (mut child, pid) = spawn("true", &[]);
        child.wait().unwrap();
        table.register(pid, "true &");
        table.shutdown_all();
        assert!(!table.has_jobs());
    }
}
