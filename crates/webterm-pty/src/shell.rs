//! Shell detection and information.
//!
//! Detects available shells on the current platform (Windows and Unix)
//! and resolves the shell a session should spawn.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Information about an available shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellInfo {
    /// Unique identifier (e.g., "bash", "zsh", "pwsh").
    pub id: String,
    /// Display name (e.g., "Bash", "Zsh", "PowerShell 7").
    pub name: String,
    /// Full path to the shell executable.
    pub path: PathBuf,
}

impl ShellInfo {
    /// Create a new ShellInfo.
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
        }
    }

    /// Build a ShellInfo from an explicit executable path (e.g. from
    /// configuration). Returns None if the path does not exist.
    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let id = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("sh")
            .to_string();
        let name = id
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string() + &id[1..])
            .unwrap_or_else(|| id.clone());
        Some(Self::new(id, name, path))
    }
}

/// Detect available shells on the current platform.
pub fn detect_available_shells() -> Vec<ShellInfo> {
    let mut shells = Vec::new();

    #[cfg(windows)]
    {
        // PowerShell 7 (pwsh)
        let pwsh7_path = PathBuf::from(r"C:\Program Files\PowerShell\7\pwsh.exe");
        if pwsh7_path.exists() {
            shells.push(ShellInfo::new("pwsh", "PowerShell 7", pwsh7_path));
        }

        // Windows PowerShell 5.1
        let pwsh5_path =
            PathBuf::from(r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe");
        if pwsh5_path.exists() {
            shells.push(ShellInfo::new(
                "powershell",
                "Windows PowerShell",
                pwsh5_path,
            ));
        }

        // Command Prompt
        let cmd_path = std::env::var("COMSPEC")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(r"C:\Windows\System32\cmd.exe"));
        if cmd_path.exists() {
            shells.push(ShellInfo::new("cmd", "Command Prompt", cmd_path));
        }
    }

    #[cfg(unix)]
    {
        let unix_shells = [
            ("bash", "Bash", "/bin/bash"),
            ("zsh", "Zsh", "/bin/zsh"),
            ("fish", "Fish", "/usr/bin/fish"),
            ("sh", "Shell", "/bin/sh"),
        ];

        for (id, name, path) in unix_shells {
            let path = PathBuf::from(path);
            if path.exists() {
                shells.push(ShellInfo::new(id, name, path));
            }
        }
    }

    shells
}

/// Get the default shell for the current platform.
pub fn default_shell() -> Option<ShellInfo> {
    // Prefer the user's SHELL environment variable on Unix.
    #[cfg(unix)]
    {
        if let Ok(shell_path) = std::env::var("SHELL") {
            let path = PathBuf::from(&shell_path);
            if let Some(info) = ShellInfo::from_path(&path) {
                return Some(info);
            }
        }
    }

    detect_available_shells().into_iter().next()
}
