use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::stream::{ByteSource, ChatRequest, ChatTransport, TransportError};

#[derive(Debug, Clone)]
pub enum Step {
    Chunk(Vec<u8>),
    Fail(TransportError),
    /// Never yields; exercises timeouts and cancellation.
    Stall,
}

impl Step {
    pub fn text(chunk: &str) -> Self {
        Step::Chunk(chunk.as_bytes().to_vec())
    }
}

pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

#[async_trait]
impl ByteSource for ScriptedSource {
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        match self.steps.pop_front()? {
            Step::Chunk(bytes) => Some(Ok(bytes)),
            Step::Fail(err) => Some(Err(err)),
            Step::Stall => std::future::pending().await,
        }
    }
}

/// Transport that replays a fixed script and remembers what it was asked.
pub struct ScriptedTransport {
    open_result: Result<Vec<Step>, TransportError>,
    stall_on_open: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            open_result: Ok(steps),
            stall_on_open: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_chunks(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|chunk| Step::text(chunk)).collect())
    }

    pub fn failing(err: TransportError) -> Self {
        Self {
            open_result: Err(err),
            stall_on_open: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn stalled() -> Self {
        Self {
            stall_on_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open(&self, request: &ChatRequest) -> Result<Box<dyn ByteSource>, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if self.stall_on_open {
            std::future::pending::<()>().await;
        }
        let steps = self.open_result.clone()?;
        Ok(Box::new(ScriptedSource::new(steps)))
    }
}

pub fn test_request() -> ChatRequest {
    ChatRequest {
        model: "test-model".to_string(),
        api_key: "test-key".to_string(),
        messages: Vec::new(),
    }
}
