//! Cross-platform PTY layer for webterm.
//!
//! Provides shell detection and managed PTY sessions: spawn a shell under
//! a pseudo-terminal, read its output, feed it input, resize it, and tear
//! it down exactly once.

pub mod session;
pub mod shell;

pub use session::{PtyError, PtySession};
pub use shell::{default_shell, detect_available_shells, ShellInfo};
