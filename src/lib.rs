//! Smallsh - Small Shell
//!
//! Runs `command [args...] [< infile] [> outfile] [&]` lines, tracking
//! background jobs and honoring a foreground-only mode toggled by SIGTSTP.

#![recursion_limit = "1024"]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces
)]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

#[macro_use]
mod util;

pub mod core;
mod editor;
pub mod errors;
pub mod shell;

pub use crate::core::job::{Job, Reaped, Status};
pub use crate::shell::{Flow, Shell, ShellConfig};
pub use crate::util::isatty;
