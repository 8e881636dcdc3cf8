//! Wire protocol for the terminal websocket.
//!
//! Each websocket text frame carries one JSON envelope with a string tag
//! and a string payload: `{"type": "input", "data": "ls\n"}`. The resize
//! payload is itself a JSON document carried inside the `data` string,
//! which is what the browser terminal emits.

use serde::Deserialize;
use thiserror::Error;

/// Errors produced while decoding a frame.
///
/// The session bridge logs these and drops the frame; none of them is
/// fatal to the session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown message tag: {0}")]
    UnknownTag(String),

    #[error("Invalid resize payload: {0}")]
    InvalidResize(String),
}

/// A control message multiplexed over the session's websocket.
///
/// `Input`, `Resize` and `Ping` flow client→server; `Output` and `Pong`
/// flow server→client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Raw keystroke bytes for the shell's stdin.
    Input(String),
    /// New terminal dimensions.
    Resize { cols: u16, rows: u16 },
    /// Keepalive request.
    Ping,
    /// Raw shell output bytes.
    Output(String),
    /// Keepalive reply.
    Pong,
}

impl ControlMessage {
    /// The wire tag for this message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Resize { .. } => "resize",
            Self::Ping => "ping",
            Self::Output(_) => "output",
            Self::Pong => "pong",
        }
    }
}

/// The JSON envelope as it appears on the wire.
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct ResizePayload {
    cols: u16,
    rows: u16,
}

/// Decode one wire frame into a [`ControlMessage`].
pub fn decode(raw: &str) -> Result<ControlMessage, ProtocolError> {
    let frame: Frame = serde_json::from_str(raw)?;
    match frame.kind.as_str() {
        "input" => Ok(ControlMessage::Input(frame.data)),
        "resize" => {
            let size: ResizePayload = serde_json::from_str(&frame.data)
                .map_err(|e| ProtocolError::InvalidResize(e.to_string()))?;
            if size.cols == 0 || size.rows == 0 {
                return Err(ProtocolError::InvalidResize(format!(
                    "{}x{} has a zero dimension",
                    size.cols, size.rows
                )));
            }
            Ok(ControlMessage::Resize {
                cols: size.cols,
                rows: size.rows,
            })
        }
        "ping" => Ok(ControlMessage::Ping),
        "output" => Ok(ControlMessage::Output(frame.data)),
        "pong" => Ok(ControlMessage::Pong),
        other => Err(ProtocolError::UnknownTag(other.to_string())),
    }
}

/// Encode a [`ControlMessage`] as one wire frame.
pub fn encode(msg: &ControlMessage) -> String {
    let data = match msg {
        ControlMessage::Input(data) | ControlMessage::Output(data) => data.clone(),
        ControlMessage::Resize { cols, rows } => {
            serde_json::json!({ "cols": cols, "rows": rows }).to_string()
        }
        ControlMessage::Ping | ControlMessage::Pong => String::new(),
    };
    serde_json::json!({ "type": msg.tag(), "data": data }).to_string()
}
