use std::time::Duration;

pub use self::execute_command::ForkPolicy;
pub use self::shell::Shell;

pub mod builtins;
pub mod execute_command;
pub mod job_control;
pub mod signals;
#[allow(clippy::module_inception)]
mod shell;

/// Prompt shown before each line in interactive mode.
pub const PROMPT: &str = ": ";

/// What the session should do after a line has been dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Number of entries to keep in the line editor's history.
    command_history_capacity: usize,

    /// Determines if SIGINT is ignored and SIGTSTP toggles foreground-only
    /// mode. Turned off for shells embedded in tests.
    install_signal_handlers: bool,

    /// Determines if some messages (e.g. "exit") should be displayed.
    display_messages: bool,

    /// How often and how patiently `fork` is retried.
    fork_policy: ForkPolicy,
}

impl ShellConfig {
    /// Creates an interactive shell
    ///
    /// # Complete List
    /// - Command history is kept for the line editor
    /// - Signal handlers are installed
    /// - Some additional messages are displayed
    pub fn interactive(command_history_capacity: usize) -> Self {
        Self {
            command_history_capacity,
            install_signal_handlers: true,
            display_messages: true,
            ..Default::default()
        }
    }

    /// Creates a noninteractive shell, e.g. for `-c` and scripts
    ///
    /// # Complete List
    /// - No command history
    /// - Signal handlers are installed
    /// - Fewer messages are displayed
    pub fn noninteractive() -> Self {
        Self {
            install_signal_handlers: true,
            ..Default::default()
        }
    }

    pub fn with_signal_handlers(self, install_signal_handlers: bool) -> Self {
        Self {
            install_signal_handlers,
            ..self
        }
    }

    pub fn with_fork_policy(self, retries: u32, delay: Duration) -> Self {
        Self {
            fork_policy: ForkPolicy { retries, delay },
            ..self
        }
    }

    pub fn command_history_capacity(&self) -> usize {
        self.command_history_capacity
    }

    pub fn display_messages(&self) -> bool {
        self.display_messages
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command_history_capacity: 0,
            install_signal_handlers: false,
            display_messages: false,
            fork_policy: ForkPolicy::default(),
        }
    }
}
