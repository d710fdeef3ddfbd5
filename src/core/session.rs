//! Session-scoped state: connection context, client-local persisted flags,
//! and the view-state machine those flags drive.

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::core::gate::SessionUsage;
use crate::utils::logging::LoggingState;

/// Narrow port over the two pieces of client-local persisted state: the
/// has-chatted activity flag and the anonymous send counter. Both live for
/// the session and are reset only by an explicit clear.
pub trait SessionStore {
    fn usage(&self) -> SessionUsage;
    fn set_usage(&mut self, usage: SessionUsage);
    fn has_chatted(&self) -> bool;
    fn mark_chatted(&mut self);
    fn clear(&mut self);
}

/// In-process store; state lives for the process lifetime.
#[derive(Debug)]
pub struct MemorySessionStore {
    limit: u32,
    usage: SessionUsage,
    has_chatted: bool,
}

impl MemorySessionStore {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            usage: SessionUsage::new(limit),
            has_chatted: false,
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn usage(&self) -> SessionUsage {
        self.usage
    }

    fn set_usage(&mut self, usage: SessionUsage) {
        self.usage = usage;
    }

    fn has_chatted(&self) -> bool {
        self.has_chatted
    }

    fn mark_chatted(&mut self) {
        self.has_chatted = true;
    }

    fn clear(&mut self) {
        self.usage = SessionUsage::new(self.limit);
        self.has_chatted = false;
    }
}

/// Presentation state derived from session activity. Ordered so that
/// transitions can only move forward; the state never regresses within a
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ViewState {
    /// No chat activity this session.
    Onboarding,
    /// The user has engaged (or had engaged before) but no turn ran yet.
    Ready,
    /// At least one turn was dispatched.
    Chatting,
}

impl ViewState {
    pub fn at_mount(has_chatted: bool) -> Self {
        if has_chatted {
            ViewState::Ready
        } else {
            ViewState::Onboarding
        }
    }

    #[must_use]
    pub fn on_focus(self) -> Self {
        self.max(ViewState::Ready)
    }

    #[must_use]
    pub fn on_send(self) -> Self {
        self.max(ViewState::Chatting)
    }
}

/// Connection and lifecycle context for one client session.
pub struct SessionContext {
    pub client: Client,
    pub base_url: String,
    pub token: Option<String>,
    pub logging: LoggingState,
    pub stream_cancel_token: Option<CancellationToken>,
    pub current_turn_id: u64,
}

impl SessionContext {
    pub fn new(client: Client, base_url: impl Into<String>, token: Option<String>, logging: LoggingState) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
            logging,
            stream_cancel_token: None,
            current_turn_id: 0,
        }
    }

    /// Cancel whatever turn is currently reading from the network.
    pub fn cancel_active_turn(&mut self) {
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
    }

    /// Supersede any in-flight turn and hand out the id + cancellation
    /// token for the next one.
    pub fn begin_turn(&mut self) -> (u64, CancellationToken) {
        self.cancel_active_turn();
        self.current_turn_id += 1;
        let token = CancellationToken::new();
        self.stream_cancel_token = Some(token.clone());
        (self.current_turn_id, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_state_never_regresses() {
        let state = ViewState::at_mount(false);
        assert_eq!(state, ViewState::Onboarding);

        let state = state.on_focus();
        assert_eq!(state, ViewState::Ready);

        let state = state.on_send();
        assert_eq!(state, ViewState::Chatting);

        // Later focus events cannot move the state backwards.
        assert_eq!(state.on_focus(), ViewState::Chatting);
    }

    #[test]
    fn mount_with_prior_activity_skips_onboarding() {
        assert_eq!(ViewState::at_mount(true), ViewState::Ready);
    }

    #[test]
    fn store_clear_resets_flag_and_counter() {
        let mut store = MemorySessionStore::new(3);
        store.mark_chatted();
        store.set_usage(crate::core::gate::record_send(
            crate::core::gate::Identity::Anonymous,
            store.usage(),
        ));
        assert!(store.has_chatted());
        assert_eq!(store.usage().sent_count, 1);

        store.clear();
        assert!(!store.has_chatted());
        assert_eq!(store.usage().sent_count, 0);
        assert_eq!(store.usage().limit, 3);
    }

    #[test]
    fn beginning_a_turn_supersedes_the_previous_one() {
        let logging = LoggingState::new(None).unwrap();
        let mut session =
            SessionContext::new(Client::new(), "https://chat.example.invalid", None, logging);

        let (first_id, first_token) = session.begin_turn();
        let (second_id, second_token) = session.begin_turn();

        assert!(second_id > first_id);
        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
    }
}
