use std::io;
use std::os::unix::prelude::*;

use nix::unistd;

/// Logs `$result` when it is an `Err`, then discards it.
///
/// For failures the shell survives and that the user has no use for.
macro_rules! log_if_err {
    ($result:expr, $fmt:expr) => {{
        if let Err(ref e) = $result {
            error!("{}: {}", $fmt, e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)*) => {{
        if let Err(ref e) = $result {
            error!("{}: {}", format_args!($fmt, $($arg)*), e);
        }
    }};
}

pub fn get_terminal() -> RawFd {
    io::stdin().as_raw_fd()
}

/// Returns `true` if the shell's stdin is a terminal.
pub fn isatty() -> bool {
    let temp_result = unistd::isatty(get_terminal());
    log_if_err!(temp_result, "unistd::isatty");
    temp_result.unwrap_or(false)
}

/// Number of decimal digits needed to print `n`.
pub fn decimal_digits(mut n: u32) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}
