//! The per-connection session bridge.
//!
//! Owns one PTY session and one websocket, and runs the two data paths
//! between them until either side dies:
//!
//! - the *output pump*: a blocking reader task pulls chunks from the PTY
//!   and hands them to a single sender task over a channel;
//! - the *input pump*: the handler task receives websocket frames and
//!   dispatches them onto the PTY (input, resize) or back onto the
//!   outbound channel (pong).
//!
//! The device is written only by the input pump and read only by the
//! output pump; the websocket is read only by the input pump and written
//! only by the sender task. Teardown converges on [`close`], which is
//! guarded by an atomic state cell so it runs exactly once no matter
//! which pump detects failure first.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use webterm_core::protocol::{self, ControlMessage};
use webterm_pty::{PtySession, ShellInfo};

/// Initial terminal dimensions; the client sends a resize once it knows
/// its actual viewport.
const INITIAL_COLS: u16 = 80;
const INITIAL_ROWS: u16 = 24;

const READ_BUF_SIZE: usize = 1024;

/// Session lifecycle states.
const STARTING: u8 = 0;
const ACTIVE: u8 = 1;
const CLOSED: u8 = 2;

/// Atomic lifecycle cell: `Starting → Active → Closed`, monotonic.
///
/// `close()` returns true for exactly one caller, which makes the
/// teardown sequence safe to trigger from any pump concurrently.
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(STARTING))
    }

    fn activate(&self) -> bool {
        self.0
            .compare_exchange(STARTING, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Transition to Closed from any state; true if this call won.
    fn close(&self) -> bool {
        self.0.swap(CLOSED, Ordering::AcqRel) != CLOSED
    }

    fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire) == CLOSED
    }
}

/// Run one terminal session over an upgraded websocket.
///
/// Returns when the session is fully torn down; dropping the socket on
/// return is what the client observes as the connection closing.
pub async fn run(mut socket: WebSocket, shell: ShellInfo, peer: SocketAddr) {
    let session_id = Uuid::new_v4();
    let state = Arc::new(StateCell::new());

    // Starting → Active on successful spawn; Starting → Closed on failure,
    // in which case no pump ever runs.
    let pty = match PtySession::spawn(&shell, INITIAL_COLS, INITIAL_ROWS) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            state.close();
            tracing::error!(%session_id, %peer, error = %e, "failed to start shell");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    state.activate();
    tracing::info!(%session_id, %peer, shell = %shell.id, "session active");

    let (ws_tx, mut ws_rx) = socket.split();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<ControlMessage>();

    // Output pump, blocking half: PTY reads feed the outbound channel.
    let reader_pty = pty.clone();
    let reader_state = state.clone();
    let reader_tx = out_tx.clone();
    let mut read_task = tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            if reader_state.is_closed() {
                break;
            }
            match reader_pty.read_blocking(&mut buf) {
                Ok(0) => {
                    tracing::debug!("pty reached EOF, shell exited");
                    break;
                }
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if reader_tx.send(ControlMessage::Output(chunk)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    if !reader_state.is_closed() {
                        tracing::debug!(error = %e, "pty read failed");
                    }
                    break;
                }
            }
        }
    });

    // Output pump, async half: the sole writer of the websocket.
    let mut send_task = tokio::spawn(async move {
        let mut ws_tx = ws_tx;
        let mut out_rx = out_rx;
        while let Some(msg) = out_rx.recv().await {
            let frame = protocol::encode(&msg);
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Input pump: dispatch client frames until the connection dies.
    let input_pty = pty.clone();
    let input_tx = out_tx.clone();
    let input_pump = async {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(raw) => {
                    if !dispatch_frame(raw.as_str(), &input_pty, &input_tx).await {
                        break;
                    }
                }
                Message::Close(_) => break,
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    };

    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut read_task => {}
        _ = input_pump => {}
    }

    close(&state, &pty, session_id);

    // Terminating the PTY unblocks the reader, which drops its channel
    // handle; dropping ours lets the sender drain any queued output and
    // exit on its own, closing the socket.
    drop(out_tx);
}

/// Handle one decoded client frame. Returns false when the session must
/// end (device write/resize failure).
async fn dispatch_frame(
    raw: &str,
    pty: &PtySession,
    out_tx: &mpsc::UnboundedSender<ControlMessage>,
) -> bool {
    match protocol::decode(raw) {
        Ok(ControlMessage::Input(data)) => {
            if let Err(e) = pty.write(data.as_bytes()).await {
                tracing::warn!(error = %e, "pty write failed");
                return false;
            }
        }
        Ok(ControlMessage::Resize { cols, rows }) => {
            if let Err(e) = pty.resize(cols, rows) {
                tracing::warn!(error = %e, "pty resize failed");
                return false;
            }
        }
        Ok(ControlMessage::Ping) => {
            let _ = out_tx.send(ControlMessage::Pong);
        }
        Ok(other) => {
            tracing::debug!(tag = other.tag(), "ignoring server-bound tag from client");
        }
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed frame");
        }
    }
    true
}

/// The single close procedure. Runs its body exactly once; every later
/// (or concurrent) invocation is a no-op.
fn close(state: &StateCell, pty: &PtySession, session_id: Uuid) {
    if !state.close() {
        return;
    }
    tracing::info!(%session_id, "session closed");
    pty.terminate();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_activates_once() {
        let cell = StateCell::new();
        assert!(cell.activate());
        assert!(!cell.activate());
        assert!(!cell.is_closed());
    }

    #[test]
    fn test_state_cell_close_wins_once() {
        let cell = StateCell::new();
        cell.activate();
        assert!(cell.close());
        assert!(!cell.close());
        assert!(!cell.close());
        assert!(cell.is_closed());
    }

    #[test]
    fn test_state_cell_close_from_starting() {
        // Spawn failure closes without ever activating.
        let cell = StateCell::new();
        assert!(cell.close());
        assert!(!cell.activate());
        assert!(cell.is_closed());
    }

    #[test]
    fn test_state_cell_concurrent_close() {
        let cell = Arc::new(StateCell::new());
        cell.activate();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cell = cell.clone();
            handles.push(std::thread::spawn(move || cell.close()));
        }

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1, "exactly one closer may run the teardown");
    }

    #[test]
    fn test_close_is_idempotent_over_pty() {
        let shell = match webterm_pty::default_shell() {
            Some(s) => s,
            None => return,
        };
        let pty = PtySession::spawn(&shell, 80, 24).unwrap();
        let state = StateCell::new();
        state.activate();

        let id = Uuid::new_v4();
        close(&state, &pty, id);
        close(&state, &pty, id);
        close(&state, &pty, id);
        assert!(pty.is_closed());
    }
}
