use std::fmt;

use rustyline::{error::ReadlineError, Config, DefaultEditor};

use crate::errors::Result;

/// Line editor for the interactive prompt, with in-memory history.
pub struct Editor {
    internal: DefaultEditor,
    history_capacity: usize,
}

impl Editor {
    pub fn with_capacity(history_capacity: usize) -> Result<Editor> {
        let config = Config::builder()
            .max_history_size(history_capacity.max(1))?
            .history_ignore_space(true)
            .auto_add_history(false)
            .build();

        Ok(Editor {
            internal: DefaultEditor::with_config(config)?,
            history_capacity,
        })
    }

    /// Reads one line. Returns `None` at end of file.
    ///
    /// An interrupt at the prompt reads as an empty line.
    pub fn readline(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.internal.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn add_history_entry(&mut self, line: &str) {
        if self.history_capacity == 0 || line.trim().is_empty() {
            return;
        }
        let temp_result = self.internal.add_history_entry(line);
        log_if_err!(temp_result, "failed to add history entry");
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Editor {{ history_capacity: {} }}", self.history_capacity)
    }
}
