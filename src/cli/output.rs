//! Status lines for command output
//!
//! Status goes to stderr so stdout carries only results (keys, tags,
//! artifact bytes) and stays safe to pipe.

use console::style;

/// Report a completed step with a dimmed detail
pub fn step_ok_detail(message: &str, detail: &str) {
    eprintln!("  {} {} ({})", style("[OK]").green(), message, style(detail).dim());
}

/// Report something informational
pub fn step_info(message: &str) {
    eprintln!("  {} {}", style("[INFO]").cyan(), message);
}

/// Report a warning with a remedy
pub fn step_warn_hint(message: &str, hint: &str) {
    eprintln!("  {} {} - {}", style("[WARN]").yellow(), message, style(hint).dim());
}
