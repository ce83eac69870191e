use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{Error, ErrorKind, Result};
use crate::shell::{
    builtins::{self, BuiltinCommand},
    Flow, Shell,
};

#[derive(Debug)]
pub struct Cd;

impl BuiltinCommand for Cd {
    const NAME: &'static str = builtins::CD_NAME;

    /// Changes to DIR, or to the home directory when DIR is omitted.
    ///
    /// DIR is tried relative to the current directory first, then as given.
    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<Flow> {
        match args.get(0) {
            None => change_to_home()?,
            Some(dir) => change_to(dir.as_ref())?,
        }
        Ok(Flow::Continue)
    }
}

fn change_to_home() -> Result<()> {
    let home = dirs::home_dir().ok_or(ErrorKind::HomeDirectoryNotFound)?;
    env::set_current_dir(&home).map_err(|_| Error::no_such_directory(vec![display(&home)]))?;
    debug!("cd: changed to home directory {}", home.display());
    Ok(())
}

fn change_to(dir: &str) -> Result<()> {
    let candidates: Vec<PathBuf> = env::current_dir()
        .ok()
        .map(|cwd| cwd.join(dir))
        .into_iter()
        .chain(Some(PathBuf::from(dir)))
        .collect();

    for candidate in &candidates {
        if env::set_current_dir(candidate).is_ok() {
            debug!("cd: changed to {}", candidate.display());
            return Ok(());
        }
    }

    Err(Error::no_such_directory(candidates.iter().map(|p| display(p))))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
