//! Capabilities the stream session consumes from the transport layer.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::message::TranscriptEntry;

/// Everything the transport needs to issue one chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub api_key: String,
    pub messages: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The backend answered with a non-success status.
    Status { status: u16, body: String },
    /// The request could not be sent.
    Connect(String),
    /// The connection failed after the response started streaming.
    Read(String),
    /// No chunk arrived within the idle window.
    Timeout(Duration),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { status, body } => {
                write!(f, "Request failed with status {status}\n{body}")
            }
            TransportError::Connect(reason) => write!(f, "Could not reach the chat backend: {reason}"),
            TransportError::Read(reason) => write!(f, "The response stream broke off: {reason}"),
            TransportError::Timeout(window) => {
                write!(f, "The chat backend sent nothing for {window:?}")
            }
        }
    }
}

impl Error for TransportError {}

/// Sequence of raw chunks ending with `None`.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, TransportError>>;
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<Box<dyn ByteSource>, TransportError>;
}
