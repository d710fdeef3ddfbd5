//! Scripted transports and fixtures shared by pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::{ChatRequest, FallbackReply, StreamEvent};
use crate::core::chat_stream::{ChatTransport, TransportError};

/// Deterministic [`ChatTransport`] that replays a scripted stream and an
/// optional fallback reply, counting how often each tier is hit.
pub struct ScriptedTransport {
    events: Vec<StreamEvent>,
    stream_fails: bool,
    fallback: Option<FallbackReply>,
    stream_calls: Arc<AtomicUsize>,
    fallback_calls: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// A stream that delivers `events` and then ends normally.
    pub fn streaming(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            stream_fails: false,
            fallback: None,
            stream_calls: Arc::default(),
            fallback_calls: Arc::default(),
        }
    }

    /// A stream that fails before producing anything.
    pub fn stream_fails() -> Self {
        Self {
            stream_fails: true,
            ..Self::streaming(Vec::new())
        }
    }

    /// A stream that delivers `events` and then fails.
    pub fn stream_fails_after(events: Vec<StreamEvent>) -> Self {
        Self {
            stream_fails: true,
            ..Self::streaming(events)
        }
    }

    /// Arm the fallback tier with a successful reply.
    pub fn with_fallback(mut self, response: &str, disclaimers: Vec<&str>) -> Self {
        self.fallback = Some(FallbackReply {
            response: response.to_string(),
            follow_ups: Vec::new(),
            disclaimers: disclaimers.into_iter().map(String::from).collect(),
        });
        self
    }

    pub fn stream_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stream_calls)
    }

    pub fn fallback_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fallback_calls)
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn stream_reply(
        &self,
        _request: &ChatRequest,
        _cancel: &CancellationToken,
        sink: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> Result<(), TransportError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        for event in &self.events {
            sink(event.clone());
        }
        if self.stream_fails {
            Err(TransportError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        } else {
            Ok(())
        }
    }

    async fn full_reply(&self, _request: &ChatRequest) -> Result<FallbackReply, TransportError> {
        self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fallback {
            Some(reply) => Ok(reply.clone()),
            None => Err(TransportError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            )),
        }
    }
}
