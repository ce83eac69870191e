use std::io::Write;

use crate::errors::Result;
use crate::shell::{
    builtins::{self, BuiltinCommand},
    Flow, Shell,
};

#[derive(Debug)]
pub struct StatusCommand;

impl BuiltinCommand for StatusCommand {
    const NAME: &'static str = builtins::STATUS_NAME;

    fn run<T: AsRef<str>>(shell: &mut Shell, _args: &[T], stdout: &mut dyn Write) -> Result<Flow> {
        writeln!(stdout, "{}", shell.last_foreground_status())?;
        Ok(Flow::Continue)
    }
}
