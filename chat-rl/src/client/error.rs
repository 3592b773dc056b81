use thiserror::Error;

use super::socket::codec::CodecError;

/// Errors raised while talking to the chat backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("socket.io protocol error: {0}")]
    Codec(#[from] CodecError),

    #[error("socket.io connection rejected: {0}")]
    Rejected(String),

    #[error("invalid backend url {0:?}")]
    InvalidUrl(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("realtime channel closed")]
    ChannelClosed,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
