//! Smallsh - Shell Module
//!
//! The Shell owns the background job table and the status of the last
//! foreground command. Each line is reaped-for, expanded, parsed, and
//! dispatched to a builtin or to the execution engine.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use nix::unistd::{self, Pid};

use super::{
    builtins,
    execute_command::{self, Spawned},
    job_control::JobTable,
    signals, Flow, ShellConfig, PROMPT,
};
use crate::{
    core::{
        job::{Job, Reaped, Status},
        parser::{ast, Command},
        variable_expansion,
    },
    editor::Editor,
    errors::{Result, ResultExt},
};

/// Smallsh Shell
pub struct Shell {
    job_table: JobTable,
    /// Status of the last foreground command. Builtins leave it alone.
    last_foreground_status: Status,
    config: ShellConfig,
    pid: Pid,
}

impl Shell {
    /// Constructs a new Shell, installing signal handlers if `config` asks for it.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        if config.install_signal_handlers {
            signals::install().chain_err(|| "failed to install signal handlers")?;
        }

        let shell = Shell {
            job_table: JobTable::default(),
            last_foreground_status: Status::default(),
            config,
            pid: unistd::getpid(),
        };

        info!("smallsh started up");
        Ok(shell)
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn last_foreground_status(&self) -> Status {
        self.last_foreground_status
    }

    /// Background jobs that have not been reaped yet.
    pub fn jobs(&self) -> &[Job] {
        self.job_table.jobs()
    }

    /// Removes and returns the background jobs that have terminated.
    pub fn reap_jobs(&mut self) -> Vec<Reaped> {
        self.job_table.reap_and_remove()
    }

    /// Terminates every background job.
    pub fn shutdown_jobs(&mut self) {
        if self.job_table.has_jobs() {
            info!("terminating {} background jobs", self.job_table.len());
        }
        self.job_table.shutdown_all();
    }

    /// Status the process should exit with.
    pub fn exit_code(&self) -> i32 {
        self.last_foreground_status.exit_code()
    }

    /// Runs one line of input.
    ///
    /// Finished background jobs are reaped and reported before the line is
    /// parsed. Messages for the user are written to `stdout`.
    pub fn execute_command_string(&mut self, input: &str, stdout: &mut dyn Write) -> Result<Flow> {
        for reaped in self.reap_jobs() {
            writeln!(stdout, "{}", reaped)?;
        }

        let expanded = variable_expansion::expand_pid(input, self.pid.as_raw() as u32);
        let command = Command::parse(&expanded);
        if !command.inner.is_blank() {
            debug!("parsed: {:?}", command.inner);
        }
        let result = self.execute_command(&command, stdout);

        if self.config.install_signal_handlers {
            log_if_err!(signals::ignore_interrupt(), "failed to restore SIGINT disposition");
        }
        stdout.flush()?;
        result
    }

    /// Runs a smallsh script from a file, stopping early at `exit`.
    ///
    /// A line that fails is reported and the script continues.
    pub fn execute_commands_from_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        stdout: &mut dyn Write,
    ) -> Result<Flow> {
        let path = path.as_ref();
        let buffer = fs::read_to_string(path)
            .chain_err(|| format!("failed to read {}", path.display()))?;

        for line in buffer.lines() {
            match self.execute_command_string(line, stdout) {
                Ok(Flow::Exit) => return Ok(Flow::Exit),
                Ok(Flow::Continue) => {}
                Err(e) => report_error(&e),
            }
        }

        Ok(Flow::Continue)
    }

    /// Runs lines from stdin until `exit` or end of file.
    pub fn execute_from_stdin(&mut self) -> Result<()> {
        let mut editor = Editor::with_capacity(self.config.command_history_capacity())?;
        let stdout = io::stdout();
        loop {
            let line = match editor.readline(PROMPT) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("prompt: {}", e);
                    continue;
                }
            };
            editor.add_history_entry(&line);

            match self.execute_command_string(&line, &mut stdout.lock()) {
                Ok(Flow::Exit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(e) => report_error(&e),
            }
        }

        // end of file behaves like `exit`
        self.shutdown_jobs();
        Ok(())
    }

    fn execute_command(&mut self, command: &Command, stdout: &mut dyn Write) -> Result<Flow> {
        match command.inner {
            ast::Command::Blank => Ok(Flow::Continue),
            ast::Command::Simple(ref simple) if builtins::is_builtin(&simple.name) => {
                builtins::run(self, &simple.name, &simple.args, stdout)
            }
            ast::Command::Simple(ref simple) => {
                self.execute_external(simple, &command.input, stdout)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute_external(
        &mut self,
        command: &ast::SimpleCommand,
        input: &str,
        stdout: &mut dyn Write,
    ) -> Result<()> {
        // anything still buffered would otherwise interleave with the child's output
        stdout.flush()?;

        let spawned = execute_command::spawn_process(
            command,
            signals::is_foreground_only(),
            &self.config.fork_policy,
        )?;
        match spawned {
            Spawned::Background(pid) => {
                self.job_table.register(pid, input);
                writeln!(stdout, "background pid is {}", pid)?;
            }
            Spawned::Foreground(status) => {
                if !status.is_success() {
                    debug!("'{}' finished with {}", command, status);
                }
                self.last_foreground_status = status;
                if let Status::Signaled(_) = status {
                    writeln!(stdout, "{}", status)?;
                }
            }
        }

        Ok(())
    }
}

fn report_error(e: &crate::errors::Error) {
    error!("{}", e);
    eprintln!("smallsh: {}", e);
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pid {}\tlast status: {}\n{:?}",
            self.pid, self.last_foreground_status, self.job_table
        )
    }
}
