pub mod config;
pub mod protocol;

pub use config::AppConfig;
pub use protocol::{ControlMessage, ProtocolError};
