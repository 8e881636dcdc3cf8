//! PTY session management.
//!
//! Wraps `portable-pty` to provide a managed PTY session: a shell process
//! attached to the slave side, with the master retained for reads, writes
//! and resize. `native_pty_system()` is the platform seam — ConPTY on
//! Windows, openpty elsewhere — so no per-call platform checks are needed.

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use crate::shell::ShellInfo;

/// Errors that can occur during PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("Failed to create PTY: {0}")]
    Creation(String),

    #[error("Failed to spawn shell: {0}")]
    Spawn(String),

    #[error("Failed to resize PTY: {0}")]
    Resize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PTY already terminated")]
    Closed,
}

/// A PTY session wrapping a shell process.
///
/// The `PtyPair` is split during construction: the slave is consumed to
/// spawn the shell, and the master is retained (behind a `std::sync::Mutex`)
/// for resize and teardown. Reader and writer are extracted from the master
/// and wrapped for shared access — the reader is meant for exactly one
/// blocking reader task, the writer for exactly one input path.
///
/// `terminate` is idempotent: the first call wins, drops the device handle
/// and kills the child; later calls (and racing writes) are no-ops.
pub struct PtySession {
    master: StdMutex<Option<Box<dyn MasterPty + Send>>>,
    child: StdMutex<Option<Box<dyn Child + Send>>>,
    reader: Arc<Mutex<Box<dyn Read + Send>>>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    shell: ShellInfo,
    size: StdMutex<PtySize>,
    closed: AtomicBool,
}

impl PtySession {
    /// Spawn `shell` under a freshly allocated PTY with the given dimensions.
    pub fn spawn(shell: &ShellInfo, cols: u16, rows: u16) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system
            .openpty(size)
            .map_err(|e| PtyError::Creation(e.to_string()))?;

        // Build the command. TERM enables full-featured interactive programs.
        let mut cmd = CommandBuilder::new(&shell.path);
        cmd.env("TERM", "xterm-256color");

        #[cfg(unix)]
        cmd.env("COLORTERM", "truecolor");

        if let Some(home) = dirs::home_dir() {
            cmd.cwd(home);
        }

        // Spawn the shell (consumes the slave).
        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn(e.to_string()))?;
        drop(pair.slave);

        // Extract reader and writer from the master.
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Creation(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Creation(e.to_string()))?;

        tracing::debug!(
            shell = %shell.id,
            cols = cols,
            rows = rows,
            "PTY session created"
        );

        Ok(Self {
            master: StdMutex::new(Some(pair.master)),
            child: StdMutex::new(Some(child)),
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
            shell: shell.clone(),
            size: StdMutex::new(size),
            closed: AtomicBool::new(false),
        })
    }

    /// Get the shell info for this session.
    pub fn shell(&self) -> &ShellInfo {
        &self.shell
    }

    /// Get the current terminal size (cols, rows).
    pub fn size(&self) -> (u16, u16) {
        let s = self.size.lock().unwrap();
        (s.cols, s.rows)
    }

    /// Whether the session has been terminated.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resize the terminal.
    ///
    /// Fails with [`PtyError::Closed`] once the session is terminated.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), PtyError> {
        if self.is_closed() {
            return Err(PtyError::Closed);
        }

        let new_size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let master = self.master.lock().unwrap();
        match master.as_ref() {
            Some(m) => m
                .resize(new_size)
                .map_err(|e| PtyError::Resize(e.to_string()))?,
            None => return Err(PtyError::Closed),
        }
        drop(master);

        *self.size.lock().unwrap() = new_size;

        tracing::debug!(cols = cols, rows = rows, "PTY resized");
        Ok(())
    }

    /// Write data to the PTY (send input to the shell).
    ///
    /// Silently no-ops once the session is terminated: the caller is
    /// expected to have stopped writing after close, but a racing write
    /// must not fail the teardown path.
    pub async fn write(&self, data: &[u8]) -> Result<(), PtyError> {
        if self.is_closed() {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Read available data from the PTY (get output from the shell).
    ///
    /// This is a blocking read — call from a dedicated thread/task via
    /// `tokio::task::spawn_blocking`. Returns `Ok(0)` on EOF (the shell
    /// side of the device closed).
    pub fn read_blocking(&self, buf: &mut [u8]) -> Result<usize, PtyError> {
        let mut reader = self.reader.blocking_lock();
        match reader.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(PtyError::Io(e)),
        }
    }

    /// Terminate the session: close the device handle and kill the shell
    /// process if it is still running. Idempotent — only the first call
    /// does any work.
    pub fn terminate(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Drop the master so the device handle is released; the reader
        // keeps its own dup and unblocks when the child dies below.
        drop(self.master.lock().unwrap().take());

        if let Some(mut child) = self.child.lock().unwrap().take() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "kill failed, shell already exited");
            }
            let _ = child.wait();
        }

        tracing::debug!(shell = %self.shell.id, "PTY session terminated");
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for PtySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (cols, rows) = self.size();
        f.debug_struct("PtySession")
            .field("shell", &self.shell.id)
            .field("size", &format!("{}x{}", cols, rows))
            .field("closed", &self.is_closed())
            .finish()
    }
}
