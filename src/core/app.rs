//! Application state tying the delivery pipeline to the terminal view.
//!
//! The app owns the transcript, the session gate wiring, and one turn
//! controller. Submits walk the same path every time: trim, authorize,
//! supersede any in-flight turn, dispatch, then record usage. In that
//! order, a blocked send never consumes quota and a transport failure
//! never double-counts.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, warn};

use crate::api::ChatRequest;
use crate::core::gate::{self, Identity};
use crate::core::message::{self, Message};
use crate::core::runner::{TurnRunner, TurnUpdate};
use crate::core::session::{SessionContext, SessionStore, ViewState};
use crate::core::turn::TurnController;

/// What the view should do after a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Dispatched,
    /// Nothing but whitespace; no send happens, no quota is consumed.
    EmptyInput,
    /// The anonymous quota is exhausted; show the sign-in prompt instead.
    SignInRequired,
}

pub struct App {
    pub session: SessionContext,
    pub store: Box<dyn SessionStore>,
    pub view_state: ViewState,
    pub messages: VecDeque<Message>,
    pub controller: TurnController,
    runner: TurnRunner,
    identity: Identity,
    conversation_id: Option<String>,
    /// True once the active turn's reply has been moved into the transcript
    /// (or there is no active turn).
    turn_finalized: bool,
}

impl App {
    pub fn new(
        session: SessionContext,
        store: Box<dyn SessionStore>,
        runner: TurnRunner,
        controller: TurnController,
    ) -> Self {
        let identity = Identity::from_token(session.token.as_deref());
        let view_state = ViewState::at_mount(store.has_chatted());
        Self {
            session,
            store,
            view_state,
            messages: VecDeque::new(),
            controller,
            runner,
            identity,
            conversation_id: None,
            turn_finalized: true,
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Remaining free sends, for the quota banner. `None` when unlimited.
    pub fn remaining_sends(&self) -> Option<u32> {
        match self.identity {
            Identity::Anonymous => Some(self.store.usage().remaining()),
            Identity::Authenticated => None,
        }
    }

    pub fn quota_exhausted(&self) -> bool {
        !gate::can_send(self.identity, self.store.usage())
    }

    pub fn on_input_focus(&mut self) {
        self.view_state = self.view_state.on_focus();
    }

    /// The in-flight reply to render under the transcript, if any.
    pub fn pending_reveal(&self) -> Option<&str> {
        if self.turn_finalized {
            None
        } else {
            Some(self.controller.displayed_text())
        }
    }

    /// True while an unfinalized turn is still arriving or revealing.
    pub fn is_revealing(&self) -> bool {
        !self.turn_finalized && self.controller.is_revealing()
    }

    /// True while arrived text is still hidden behind the reveal lag.
    pub fn has_hidden_text(&self) -> bool {
        !self.turn_finalized
            && self.controller.full_text().len() > self.controller.displayed_text().len()
    }

    /// Validate, authorize, and dispatch one turn.
    pub fn submit(&mut self, raw: &str) -> SubmitOutcome {
        let text = raw.trim();
        if text.is_empty() {
            return SubmitOutcome::EmptyInput;
        }
        if !gate::can_send(self.identity, self.store.usage()) {
            return SubmitOutcome::SignInRequired;
        }

        self.interrupt_active_turn();

        // History covers prior turns only; the new message travels in its
        // own field.
        let history = message::api_history(self.messages.iter());
        let request = ChatRequest {
            message: text.to_string(),
            conversation_id: self.conversation_id.clone(),
            history,
        };

        self.messages.push_back(Message::user(text));
        if let Err(e) = self.session.logging.log_message(&format!("You: {text}")) {
            warn!("failed to log message: {e}");
        }

        let (turn_id, cancel) = self.session.begin_turn();
        self.controller.begin_turn(turn_id);
        self.controller
            .set_on_complete(move || debug!("turn {turn_id} fully revealed"));
        self.turn_finalized = false;
        self.runner.spawn(request, cancel, turn_id);

        // Only a dispatched send consumes quota.
        self.store
            .set_usage(gate::record_send(self.identity, self.store.usage()));
        self.store.mark_chatted();
        self.view_state = self.view_state.on_send();
        SubmitOutcome::Dispatched
    }

    /// Apply one delivery update from the runner channel.
    pub fn handle_update(&mut self, update: TurnUpdate, turn_id: u64) {
        self.controller.handle_update(update, turn_id);
        self.adopt_conversation_id();
        self.finalize_if_complete();
    }

    /// Drive the reveal animation one frame.
    pub fn on_frame(&mut self, now: Instant) {
        self.controller.on_frame(now);
        self.finalize_if_complete();
    }

    /// Reveal everything that has arrived, immediately.
    pub fn skip_reveal(&mut self) {
        self.controller.skip_animation();
        self.finalize_if_complete();
    }

    /// Cancel the in-flight turn, keeping whatever the user already saw.
    pub fn cancel_active_turn(&mut self) {
        self.interrupt_active_turn();
    }

    fn interrupt_active_turn(&mut self) {
        self.session.cancel_active_turn();
        if !self.turn_finalized {
            let shown = self.controller.displayed_text().to_string();
            if !shown.is_empty() {
                self.messages.push_back(Message::assistant(shown));
            }
            self.turn_finalized = true;
        }
        self.controller.teardown();
    }

    fn adopt_conversation_id(&mut self) {
        if self.conversation_id.is_some() {
            return;
        }
        if let Some(id) = self
            .controller
            .active_turn()
            .and_then(|turn| turn.conversation_id.clone())
        {
            self.conversation_id = Some(id);
        }
    }

    /// Move a finished reply into the transcript exactly once, together
    /// with its disclaimers and follow-up suggestions.
    fn finalize_if_complete(&mut self) {
        if self.turn_finalized || !self.controller.is_complete() {
            return;
        }
        self.turn_finalized = true;

        let text = self.controller.full_text().to_string();
        self.messages.push_back(Message::assistant(text.clone()));
        if let Err(e) = self
            .session
            .logging
            .log_message(&format!("Assistant: {text}"))
        {
            warn!("failed to log message: {e}");
        }

        if let Some(turn) = self.controller.active_turn() {
            for disclaimer in &turn.disclaimers {
                self.messages.push_back(Message::app_info(disclaimer.clone()));
            }
            if !turn.follow_ups.is_empty() {
                self.messages.push_back(Message::app_info(format!(
                    "Try asking: {}",
                    turn.follow_ups.join(" · ")
                )));
            }
        }
    }
}
