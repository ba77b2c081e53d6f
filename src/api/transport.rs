use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::debug;

use crate::api::error::format_api_error;
use crate::api::ChatRequestBody;
use crate::core::stream::{ByteSource, ChatRequest, ChatTransport, TransportError};
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

/// Streams chat completions over HTTP from an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<Box<dyn ByteSource>, TransportError> {
        let chat_url = construct_api_url(&self.base_url, "chat/completions");
        let body = ChatRequestBody::streaming(&request.model, &request.messages);

        let http_request = self
            .client
            .post(&chat_url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream");
        let http_request = add_auth_headers(http_request, &request.api_key);

        debug!(url = %chat_url, model = %request.model, messages = body.messages.len(), "opening chat stream");
        let response = http_request
            .json(&body)
            .send()
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(TransportError::Status {
                status,
                body: format_api_error(&error_text),
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| TransportError::Read(err.to_string()))
            })
            .boxed();
        Ok(Box::new(ResponseSource { stream }))
    }
}

struct ResponseSource {
    stream: BoxStream<'static, Result<Vec<u8>, TransportError>>,
}

#[async_trait]
impl ByteSource for ResponseSource {
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.stream.next().await
    }
}
