//! End-to-end delivery of a single chat turn.
//!
//! Every turn walks the same ladder: stream the reply; if the stream fails,
//! fetch the whole reply once from the non-streaming endpoint; if that fails
//! too, deliver a fixed apology. All three rungs speak through the same
//! content-append path, so downstream consumers render exactly one shape.
//!
//! The two transport tiers are strictly sequential and each runs at most
//! once per turn. A stream that succeeds at the HTTP level but produces
//! neither content nor a `done` event is failure-shaped and takes the
//! fallback rung.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatRequest, StreamEvent};
use crate::core::chat_stream::{ChatTransport, TransportError};
use crate::core::constants::DELIVERY_APOLOGY;

/// Update emitted toward the turn controller, tagged with its turn id at
/// the channel so superseded turns can be discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnUpdate {
    ConversationId(String),
    Delta(String),
    Sources(serde_json::Value),
    /// Streaming produced partial text before failing; the turn's buffer
    /// restarts before fallback content arrives.
    RestartContent,
    Completed(TurnReceipt),
}

/// Terminal metadata for a delivered turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReceipt {
    pub disclaimers: Vec<String>,
    pub follow_ups: Vec<String>,
    /// True when the apology path delivered this turn.
    pub errored: bool,
}

/// Spawns and drives delivery tasks, one per turn.
#[derive(Clone)]
pub struct TurnRunner {
    transport: Arc<dyn ChatTransport>,
    tx: mpsc::UnboundedSender<(TurnUpdate, u64)>,
}

impl TurnRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        tx: mpsc::UnboundedSender<(TurnUpdate, u64)>,
    ) -> Self {
        Self { transport, tx }
    }

    /// Spawn the delivery task for one turn. Cancelling the token stops the
    /// read loop; any update sent after cancellation is dropped by the
    /// controller's turn-id check as well.
    pub fn spawn(&self, request: ChatRequest, cancel: CancellationToken, turn_id: u64) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            run_turn(transport.as_ref(), &tx, &request, &cancel, turn_id).await;
        });
    }
}

pub(crate) async fn run_turn(
    transport: &dyn ChatTransport,
    tx: &mpsc::UnboundedSender<(TurnUpdate, u64)>,
    request: &ChatRequest,
    cancel: &CancellationToken,
    turn_id: u64,
) {
    let mut receipt: Option<TurnReceipt> = None;
    let mut saw_content = false;

    let result = {
        let mut sink = |event: StreamEvent| match event {
            StreamEvent::ConversationId { conversation_id } => {
                let _ = tx.send((TurnUpdate::ConversationId(conversation_id), turn_id));
            }
            StreamEvent::Content { content } => {
                saw_content = true;
                let _ = tx.send((TurnUpdate::Delta(content), turn_id));
            }
            StreamEvent::Sources { sources } => {
                let _ = tx.send((TurnUpdate::Sources(sources), turn_id));
            }
            StreamEvent::Done {
                disclaimers,
                follow_up_questions,
            } => {
                receipt = Some(TurnReceipt {
                    disclaimers,
                    follow_ups: follow_up_questions,
                    errored: false,
                });
            }
        };
        transport.stream_reply(request, cancel, &mut sink).await
    };

    if cancel.is_cancelled() {
        return;
    }

    let stream_result = match result {
        Ok(()) if receipt.is_some() || saw_content => Ok(()),
        Ok(()) => Err(TransportError::EmptyReply),
        Err(e) => Err(e),
    };

    match stream_result {
        Ok(()) => {
            let receipt = receipt.unwrap_or_default();
            let _ = tx.send((TurnUpdate::Completed(receipt), turn_id));
        }
        Err(stream_error) => {
            debug!("streaming tier failed, trying full reply: {stream_error}");
            if saw_content {
                let _ = tx.send((TurnUpdate::RestartContent, turn_id));
            }
            match transport.full_reply(request).await {
                _ if cancel.is_cancelled() => {}
                Ok(reply) => {
                    let _ = tx.send((TurnUpdate::Delta(reply.response), turn_id));
                    let _ = tx.send((
                        TurnUpdate::Completed(TurnReceipt {
                            disclaimers: reply.disclaimers,
                            follow_ups: reply.follow_ups,
                            errored: false,
                        }),
                        turn_id,
                    ));
                }
                Err(fallback_error) => {
                    warn!("fallback tier failed after streaming failure: {fallback_error}");
                    let _ = tx.send((TurnUpdate::Delta(DELIVERY_APOLOGY.to_string()), turn_id));
                    let _ = tx.send((
                        TurnUpdate::Completed(TurnReceipt {
                            errored: true,
                            ..TurnReceipt::default()
                        }),
                        turn_id,
                    ));
                }
            }
        }
    }
}
