extern crate docopt;
#[macro_use]
extern crate error_chain;
extern crate fern;
#[macro_use]
extern crate log;
extern crate nix;
#[macro_use]
extern crate serde_derive;
extern crate smallsh;

use std::io;
use std::path::PathBuf;
use std::process;

use docopt::Docopt;
use nix::unistd::Pid;
use smallsh::errors::*;
use smallsh::{Flow, Shell, ShellConfig};

const COMMAND_HISTORY_CAPACITY: usize = 100;
const LOG_FILE_NAME: &str = ".smallsh_log";
const FAILURE_EXIT_STATUS: i32 = 1;

const USAGE: &str = "
smallsh.

Usage:
    smallsh [options]
    smallsh [options] -c <command>
    smallsh [options] <file>
    smallsh (-h | --help)
    smallsh --version

Options:
    -h --help       Show this screen.
    --version       Show version.
    -c              If the -c option is present, then commands are read from the first non-option
                        argument command_string.
    --log=<path>    File to write log to, defaults to ~/.smallsh_log
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    arg_file: Option<String>,
    flag_version: bool,
    flag_c: bool,
    flag_log: Option<String>,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if let Err(e) = init_logger(&args.flag_log) {
        eprintln!("smallsh: logging disabled: {}", e);
    }
    debug!("{:?}", args);

    if args.flag_version {
        println!("smallsh version {}", env!("CARGO_PKG_VERSION"));
    } else if args.flag_c || args.arg_file.is_some() {
        execute_from_command_string_or_file(&args);
    } else {
        execute_from_stdin();
    }
}

fn init_logger(path: &Option<String>) -> Result<()> {
    let log_path = match path.clone().map(PathBuf::from).or_else(default_log_path) {
        Some(log_path) => log_path,
        None => bail!("unable to get home directory"),
    };

    let pid = Pid::this();
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
        .chain(fern::log_file(log_path)?)
        .apply()
        .chain_err(|| "failed to install logger")?;
    Ok(())
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_FILE_NAME))
}

fn execute_from_command_string_or_file(args: &Args) -> ! {
    let mut shell =
        Shell::new(ShellConfig::noninteractive()).unwrap_or_else(|e| display_error_and_exit(&e));

    let stdout = io::stdout();
    let result = if let Some(ref command) = args.arg_command {
        shell.execute_command_string(command, &mut stdout.lock())
    } else if let Some(ref file_path) = args.arg_file {
        shell.execute_commands_from_file(file_path, &mut stdout.lock())
    } else {
        unreachable!();
    };

    exit(result, &mut shell, false);
}

fn execute_from_stdin() -> ! {
    let config = if smallsh::isatty() {
        ShellConfig::interactive(COMMAND_HISTORY_CAPACITY)
    } else {
        ShellConfig::noninteractive()
    };
    let mut shell = Shell::new(config).unwrap_or_else(|e| display_error_and_exit(&e));
    let result = shell.execute_from_stdin().map(|()| Flow::Exit);
    exit(result, &mut shell, config.display_messages());
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error);
    eprintln!("smallsh: {}", error);
    process::exit(FAILURE_EXIT_STATUS);
}

/// Terminates remaining background jobs and exits with the status of the last
/// foreground command, or with failure if `result` is an error.
fn exit(result: Result<Flow>, shell: &mut Shell, display_messages: bool) -> ! {
    shell.shutdown_jobs();
    if display_messages {
        println!("exit");
    }

    let code = match result {
        Ok(_) => shell.exit_code(),
        Err(e) => {
            error!("{}", e);
            eprintln!("smallsh: {}", e);
            FAILURE_EXIT_STATUS
        }
    };

    info!("smallsh has shut down");
    process::exit(code & 0xff);
}
