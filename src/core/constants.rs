//! Shared constants used across the application

/// Default chat service root when neither config nor CLI provides one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Streaming endpoint, joined onto the base URL.
pub const STREAM_ENDPOINT: &str = "chat/stream";

/// Non-streaming endpoint used when the stream fails.
pub const FALLBACK_ENDPOINT: &str = "chat";

/// Minimum milliseconds between two revealed characters.
pub const DEFAULT_CHAR_DELAY_MS: u64 = 12;

/// Revealed characters buffered before a display flush.
pub const DEFAULT_REVEAL_BATCH: usize = 3;

/// Free sends per session before anonymous users are asked to sign in.
pub const DEFAULT_ANONYMOUS_SEND_LIMIT: u32 = 3;

/// Shown when both the streaming and the full-response tier fail. Delivered
/// through the normal reveal path so the view renders it like any reply.
pub const DELIVERY_APOLOGY: &str =
    "Sorry, something went wrong while answering. Please try again in a moment.";
