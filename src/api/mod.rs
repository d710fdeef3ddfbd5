use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One prior exchange entry sent with a chat request.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Request body shared by the streaming and full-response endpoints.
#[derive(Serialize, Clone, Debug)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub history: Vec<HistoryMessage>,
}

/// One decoded event from the `data: <json>` stream.
///
/// The payload is shape-discriminated by its `type` field at the parse
/// boundary; unrecognized tags fail to deserialize and are skipped by the
/// stream consumer rather than aborting the stream.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The backend assigned (or confirmed) the conversation this turn
    /// belongs to. Sent at most once per turn.
    ConversationId { conversation_id: String },
    /// An incremental fragment of the assistant reply.
    Content { content: String },
    /// Citation metadata. Passed through opaquely; never inspected here.
    Sources {
        #[serde(default)]
        sources: Value,
    },
    /// Terminal event: no more content is coming.
    Done {
        #[serde(default)]
        disclaimers: Vec<String>,
        #[serde(default)]
        follow_up_questions: Vec<String>,
    },
}

/// Reply from the non-streaming endpoint.
#[derive(Deserialize, Clone, Debug)]
pub struct FallbackReply {
    pub response: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub disclaimers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_events_decode_by_tag() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"conversation_id","conversation_id":"c1"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::ConversationId {
                conversation_id: "c1".to_string()
            }
        );

        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"content","content":"Hello! "}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Content {
                content: "Hello! ".to_string()
            }
        );

        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"done","disclaimers":["X"]}"#).unwrap();
        match event {
            StreamEvent::Done {
                disclaimers,
                follow_up_questions,
            } => {
                assert_eq!(disclaimers, vec!["X".to_string()]);
                assert!(follow_up_questions.is_empty());
            }
            other => panic!("expected done, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_tags_are_rejected() {
        assert!(serde_json::from_str::<StreamEvent>(r#"{"type":"telemetry","ms":3}"#).is_err());
        assert!(serde_json::from_str::<StreamEvent>(r#"{"content":"no tag"}"#).is_err());
    }

    #[test]
    fn request_omits_absent_conversation_id() {
        let request = ChatRequest {
            message: "hi".to_string(),
            conversation_id: None,
            history: Vec::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("conversation_id"));

        let request = ChatRequest {
            conversation_id: Some("c9".to_string()),
            ..request
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""conversation_id":"c9""#));
    }

    #[test]
    fn fallback_reply_fills_missing_lists() {
        let reply: FallbackReply = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert_eq!(reply.response, "hi");
        assert!(reply.follow_ups.is_empty());
        assert!(reply.disclaimers.is_empty());
    }
}
