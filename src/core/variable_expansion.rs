//! `$$` expansion.

use crate::util;

/// Two-character marker replaced by the shell's pid.
pub const PID_MARKER: &str = "$$";

/// Replaces every `$$` in `line` with the decimal form of `pid`.
///
/// Markers are matched left to right without overlap, so `$$$` becomes the
/// pid followed by a single `$`. Substituted digits are never re-scanned.
pub fn expand_pid(line: &str, pid: u32) -> String {
    let occurrences = line.matches(PID_MARKER).count();
    if occurrences == 0 {
        return line.to_string();
    }

    let mut expanded = String::with_capacity(line.len() + occurrences * util::decimal_digits(pid));
    let pid = pid.to_string();
    let mut pieces = line.split(PID_MARKER);
    if let Some(first) = pieces.next() {
        expanded.push_str(first);
    }
    for piece in pieces {
        expanded.push_str(&pid);
        expanded.push_str(piece);
    }
    expanded
}
