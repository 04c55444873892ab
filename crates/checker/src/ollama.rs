use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::provider::{InferenceError, InferenceProvider, InferenceRequest};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

const CONNECTION_ERROR: &str =
    "No running inference server detected. Start it with: `ollama serve`";

/// Client for a local Ollama-style `/api/generate` endpoint.
///
/// Supports both streamed (line-delimited JSON chunks) and single-shot
/// responses. A streamed line that fails to parse is dropped rather than
/// aborting the read; the transport closing (or a chunk with `done: true`)
/// ends accumulation.
enum ChunkLine {
    Blank,
    Parsed { done: bool },
}

pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    cancel: CancellationToken,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts an in-flight `generate` call. Cloning is cheap;
    /// cancelling the clone cancels the request.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint.trim_end_matches('/'))
    }

    fn request_body(&self, request: &InferenceRequest) -> JsonValue {
        let mut body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": request.stream,
        });
        if !request.options.is_empty() {
            body["options"] = serde_json::to_value(&request.options)
                .unwrap_or(JsonValue::Null);
        }
        body
    }

    async fn send(&self, request: &InferenceRequest) -> Result<reqwest::Response, InferenceError> {
        let url = self.generate_url();
        debug!("Sending inference request to {} (stream: {})", url, request.stream);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    InferenceError::Transport(format!("{CONNECTION_ERROR}: {e}"))
                } else {
                    InferenceError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(InferenceError::Transport(format!(
                "inference service returned HTTP {}",
                response.status()
            )));
        }

        Ok(response)
    }

    /// Read a streamed response to completion, concatenating the `response`
    /// field of each well-formed chunk in receipt order. A transport that
    /// closes without ever delivering a parseable chunk is an empty body.
    async fn read_stream(&self, response: reqwest::Response) -> Result<String, InferenceError> {
        let mut stream = response.bytes_stream();
        let mut buf = BytesMut::new();
        let mut accumulated = String::new();
        let mut parsed_chunks = 0usize;
        let mut dropped_lines = 0usize;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    // Dropping the stream closes the underlying connection.
                    return Err(InferenceError::Cancelled);
                }
                chunk = stream.next() => chunk,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => return Err(InferenceError::Transport(e.to_string())),
                None => break,
            };

            buf.extend_from_slice(&bytes);
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line = buf.split_to(pos + 1);
                match Self::append_chunk_line(&line, &mut accumulated) {
                    Ok(ChunkLine::Parsed { done }) => {
                        parsed_chunks += 1;
                        if done {
                            return Ok(accumulated);
                        }
                    }
                    Ok(ChunkLine::Blank) => {}
                    Err(()) => dropped_lines += 1,
                }
            }
        }

        // The final chunk may arrive without a trailing newline.
        if !buf.is_empty() {
            match Self::append_chunk_line(&buf, &mut accumulated) {
                Ok(ChunkLine::Parsed { .. }) => parsed_chunks += 1,
                Ok(ChunkLine::Blank) => {}
                Err(()) => dropped_lines += 1,
            }
        }

        if dropped_lines > 0 {
            warn!("Dropped {} malformed chunk lines from stream", dropped_lines);
        }

        if parsed_chunks == 0 {
            return Err(InferenceError::EmptyBody);
        }

        Ok(accumulated)
    }

    /// Parse one line of the NDJSON stream and append its incremental text.
    /// `Err(())` means the line is not valid JSON (the caller skips it, not
    /// fatal); blank lines are distinguished so an all-blank stream still
    /// counts as an empty body.
    fn append_chunk_line(line: &[u8], accumulated: &mut String) -> Result<ChunkLine, ()> {
        let text = std::str::from_utf8(line).map_err(|_| ())?.trim();
        if text.is_empty() {
            return Ok(ChunkLine::Blank);
        }

        let value: JsonValue = serde_json::from_str(text).map_err(|_| ())?;
        if let Some(token) = value.get("response").and_then(|r| r.as_str()) {
            accumulated.push_str(token);
        }

        Ok(ChunkLine::Parsed {
            done: value.get("done").and_then(|d| d.as_bool()).unwrap_or(false),
        })
    }

    async fn read_single_shot(&self, response: reqwest::Response) -> Result<String, InferenceError> {
        let body = tokio::select! {
            _ = self.cancel.cancelled() => return Err(InferenceError::Cancelled),
            body = response.json::<JsonValue>() => {
                body.map_err(|e| InferenceError::InvalidResponse(e.to_string()))?
            }
        };

        body.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or(InferenceError::EmptyBody)
    }
}

#[async_trait]
impl InferenceProvider for OllamaClient {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        if self.cancel.is_cancelled() {
            return Err(InferenceError::Cancelled);
        }

        let response = self.send(&request).await?;

        let output = if request.stream {
            self.read_stream(response).await?
        } else {
            self.read_single_shot(response).await?
        };

        debug!("Inference produced {} chars", output.len());
        Ok(output)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
