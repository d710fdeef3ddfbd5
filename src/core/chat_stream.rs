//! Streaming transport for chat turns.
//!
//! The service replies with a long-lived HTTP body framed as
//! `data: <json>\n` lines. Bytes arrive in arbitrary chunks, so framing is
//! done by an incremental [`LineSplitter`] that carries the trailing partial
//! line between reads. One malformed line is logged and skipped; it never
//! aborts the stream.

use std::fmt;

use async_trait::async_trait;
use futures_util::StreamExt;
use memchr::memchr;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::{ChatRequest, FallbackReply, StreamEvent};
use crate::core::constants::{FALLBACK_ENDPOINT, STREAM_ENDPOINT};
use crate::utils::url::construct_api_url;

/// Splits an arbitrary byte feed into complete text lines.
///
/// The trailing partial line is retained until its newline arrives, so chunk
/// boundaries never change the produced lines.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and collect every line it completes. Lines that are
    /// not valid UTF-8 are dropped with a log line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => lines.push(line.trim_end_matches('\r').to_string()),
                Err(e) => warn!("invalid UTF-8 in stream line: {e}"),
            }
            self.buffer.drain(..=newline_pos);
        }
        lines
    }

    /// Bytes held back while waiting for the rest of a line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

/// Decode one framed line into a stream event.
///
/// Returns `None` for blank lines, comment lines, lines without a `data:`
/// prefix, and payloads that do not parse as a known event shape.
pub fn decode_stream_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = line.strip_prefix("data:")?.trim_start();
    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("skipping malformed stream event: {e}");
            None
        }
    }
}

/// Failure of a single transport tier. Callers can tell this apart from a
/// stream that ended normally; only failures trigger the next tier.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be sent or the connection dropped mid-read.
    Http(reqwest::Error),
    /// The server answered with a non-success status.
    Status(reqwest::StatusCode),
    /// The response completed without producing a usable reply.
    EmptyReply,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Http(e) => write!(f, "HTTP error: {e}"),
            TransportError::Status(status) => write!(f, "server returned {status}"),
            TransportError::EmptyReply => write!(f, "response carried no usable reply"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e)
    }
}

/// Transport port for one chat turn: a streaming tier and a single-shot
/// fallback tier. Implemented over HTTP in production and scripted in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Stream the reply, handing each decoded event to `sink` in arrival
    /// order. `Ok` means the stream ended without a transport fault; it does
    /// not by itself mean a usable reply was produced.
    async fn stream_reply(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        sink: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> Result<(), TransportError>;

    /// Fetch the whole reply in one response.
    async fn full_reply(&self, request: &ChatRequest) -> Result<FallbackReply, TransportError>;
}

/// HTTP implementation of [`ChatTransport`] against the chat service.
pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChatTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        let request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn stream_reply(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        sink: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> Result<(), TransportError> {
        let response = self
            .post(STREAM_ENDPOINT)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        let mut stream = response.bytes_stream();
        let mut splitter = LineSplitter::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = stream.next() => {
                    let Some(chunk) = chunk else { break };
                    let bytes = chunk.map_err(TransportError::Http)?;
                    for line in splitter.push(&bytes) {
                        if let Some(event) = decode_stream_line(&line) {
                            let done = matches!(event, StreamEvent::Done { .. });
                            sink(event);
                            if done {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn full_reply(&self, request: &ChatRequest) -> Result<FallbackReply, TransportError> {
        let response = self.post(FALLBACK_ENDPOINT).json(request).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }
        Ok(response.json::<FallbackReply>().await?)
    }
}
