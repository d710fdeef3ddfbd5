//! Send authorization for anonymous and authenticated identities.
//!
//! The decision is a pure function of `(identity, usage)` so it can be
//! tested without any session storage behind it. Recording a send is also
//! pure; the caller persists the returned counter through its session
//! store, and only after the send was actually dispatched, so a blocked
//! send never consumes quota.

/// Whether the user presented credentials this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated,
}

impl Identity {
    /// Presence of a non-empty token is the whole identity signal; the
    /// token's contents are never inspected here.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(token) if !token.trim().is_empty() => Identity::Authenticated,
            _ => Identity::Anonymous,
        }
    }
}

/// Per-session anonymous usage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUsage {
    pub sent_count: u32,
    pub limit: u32,
}

impl SessionUsage {
    pub fn new(limit: u32) -> Self {
        Self {
            sent_count: 0,
            limit,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.sent_count)
    }
}

/// May this identity send another message right now?
pub fn can_send(identity: Identity, usage: SessionUsage) -> bool {
    match identity {
        Identity::Authenticated => true,
        Identity::Anonymous => usage.sent_count < usage.limit,
    }
}

/// Account for a successfully dispatched send. Only anonymous sends count.
#[must_use]
pub fn record_send(identity: Identity, usage: SessionUsage) -> SessionUsage {
    match identity {
        Identity::Authenticated => usage,
        Identity::Anonymous => SessionUsage {
            sent_count: usage.sent_count + 1,
            ..usage
        },
    }
}
