//! Signal dispositions and the foreground-only mode flag.
//!
//! The shell ignores SIGINT and handles SIGTSTP by toggling foreground-only
//! mode. Children inherit neither: see `prepare_child`.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::{
    libc,
    sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal},
    unistd,
};

use crate::errors::Result;

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

const ENTER_FOREGROUND_ONLY_MESSAGE: &[u8] =
    b"\nEntering foreground-only mode (& is now ignored)\n: ";
const EXIT_FOREGROUND_ONLY_MESSAGE: &[u8] = b"\nExiting foreground-only mode\n: ";

/// Returns `true` while `&` is being ignored.
pub fn is_foreground_only() -> bool {
    FOREGROUND_ONLY.load(Ordering::SeqCst)
}

/// Flips foreground-only mode, returning the new value.
pub fn toggle_foreground_only() -> bool {
    toggle(&FOREGROUND_ONLY)
}

fn toggle(flag: &AtomicBool) -> bool {
    !flag.fetch_xor(true, Ordering::SeqCst)
}

/// Only async-signal-safe calls are allowed here.
extern "C" fn handle_sigtstp(_: libc::c_int) {
    let message = if toggle_foreground_only() {
        ENTER_FOREGROUND_ONLY_MESSAGE
    } else {
        EXIT_FOREGROUND_ONLY_MESSAGE
    };
    let _ = unistd::write(libc::STDOUT_FILENO, message);
}

/// Installs the shell's dispositions for SIGINT and SIGTSTP.
pub fn install() -> Result<()> {
    ignore_interrupt()?;
    let action = SigAction::new(
        SigHandler::Handler(handle_sigtstp),
        SaFlags::SA_RESTART,
        SigSet::all(),
    );
    unsafe {
        signal::sigaction(Signal::SIGTSTP, &action)?;
    }
    debug!("installed SIGINT and SIGTSTP dispositions");
    Ok(())
}

/// Restores SIGINT to ignored in the shell.
pub fn ignore_interrupt() -> Result<()> {
    set_disposition(Signal::SIGINT, SigHandler::SigIgn)?;
    Ok(())
}

/// Sets the dispositions of a freshly forked child.
///
/// Runs between `fork` and `exec`, so it must stay async-signal-safe.
pub(crate) fn prepare_child(foreground: bool) -> nix::Result<()> {
    set_disposition(Signal::SIGTSTP, SigHandler::SigIgn)?;
    if foreground {
        set_disposition(Signal::SIGINT, SigHandler::SigDfl)?;
    }
    Ok(())
}

fn set_disposition(signal: Signal, handler: SigHandler) -> nix::Result<()> {
    let action = SigAction::new(handler, SaFlags::SA_RESTART, SigSet::all());
    unsafe { signal::sigaction(signal, &action) }.map(|_| ())
}
