use std::io::Write;

use crate::errors::Result;
use crate::shell::{
    builtins::{self, BuiltinCommand},
    Flow, Shell,
};

#[derive(Debug)]
pub struct Exit;

impl BuiltinCommand for Exit {
    const NAME: &'static str = builtins::EXIT_NAME;

    /// Terminates every background job, then ends the session. Arguments are
    /// ignored.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<Flow> {
        if !args.is_empty() {
            debug!("{}: ignoring {} arguments", Self::NAME, args.len());
        }
        shell.shutdown_jobs();
        Ok(Flow::Exit)
    }
}
