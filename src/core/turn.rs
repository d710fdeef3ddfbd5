//! Per-turn coordination between delivery and display.
//!
//! The controller owns one reveal engine and applies delivery updates to it.
//! Every update carries the turn id it belongs to; updates from a superseded
//! turn are dropped here, so a late chunk from a cancelled request can never
//! leak into a newer turn's buffer.

use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::core::frame_clock::FrameClock;
use crate::core::reveal::{RevealConfig, RevealEngine};
use crate::core::runner::TurnUpdate;

/// Lifecycle of a single chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Created; no delivery activity yet.
    Pending,
    /// Deltas may still arrive.
    Streaming,
    /// Arrival finished; the display is catching up.
    Revealing,
    /// Arrival finished and the display caught up.
    Complete,
    /// Delivered through the apology path; the text still renders normally.
    Failed,
}

/// One user message + assistant reply cycle.
#[derive(Debug)]
pub struct Turn {
    pub id: u64,
    /// Set exactly once, from the first `conversation_id` event.
    pub conversation_id: Option<String>,
    pub disclaimers: Vec<String>,
    pub follow_ups: Vec<String>,
    /// Citation payloads, passed through opaquely for the host to render.
    pub sources: Vec<Value>,
    state: TurnState,
    errored: bool,
}

impl Turn {
    fn new(id: u64) -> Self {
        Self {
            id,
            conversation_id: None,
            disclaimers: Vec::new(),
            follow_ups: Vec::new(),
            sources: Vec::new(),
            state: TurnState::Pending,
            errored: false,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }
}

pub struct TurnController {
    engine: RevealEngine,
    turn: Option<Turn>,
}

impl TurnController {
    pub fn new(clock: Box<dyn FrameClock>, config: RevealConfig) -> Self {
        Self {
            engine: RevealEngine::new(clock, config),
            turn: None,
        }
    }

    /// Begin a new turn. The engine is reset so no characters, callbacks,
    /// or frame registrations carry over from a prior turn.
    pub fn begin_turn(&mut self, id: u64) {
        self.engine.reset();
        self.turn = Some(Turn::new(id));
    }

    /// Register the notification fired when the active turn completes.
    /// Call after [`TurnController::begin_turn`]; `begin_turn` clears it.
    pub fn set_on_complete(&mut self, callback: impl FnMut() + 'static) {
        self.engine.set_on_complete(callback);
    }

    pub fn active_turn(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    pub fn state(&self) -> Option<TurnState> {
        self.turn.as_ref().map(Turn::state)
    }

    /// The lagging prefix currently shown for the active turn.
    pub fn displayed_text(&self) -> &str {
        self.engine.displayed_text()
    }

    /// Everything that has arrived for the active turn.
    pub fn full_text(&self) -> &str {
        self.engine.full_text()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state(), Some(TurnState::Complete | TurnState::Failed))
    }

    /// True while the display lags or more input may arrive.
    pub fn is_revealing(&self) -> bool {
        self.turn.is_some() && self.engine.is_animating()
    }

    /// Apply one delivery update. Updates whose id does not match the
    /// active turn are dropped.
    pub fn handle_update(&mut self, update: TurnUpdate, turn_id: u64) {
        let Some(turn) = self.turn.as_mut() else {
            debug!("dropping update for torn-down turn {turn_id}");
            return;
        };
        if turn.id != turn_id {
            debug!("dropping update for superseded turn {turn_id}");
            return;
        }

        match update {
            TurnUpdate::ConversationId(id) => {
                if turn.conversation_id.is_none() {
                    turn.conversation_id = Some(id);
                }
            }
            TurnUpdate::Delta(text) => {
                if turn.state == TurnState::Pending {
                    turn.state = TurnState::Streaming;
                }
                self.engine.append_text(&text);
            }
            TurnUpdate::Sources(payload) => {
                turn.sources.push(payload);
            }
            TurnUpdate::RestartContent => {
                self.engine.clear_input();
            }
            TurnUpdate::Completed(receipt) => {
                turn.disclaimers = receipt.disclaimers;
                turn.follow_ups = receipt.follow_ups;
                turn.errored = receipt.errored;
                turn.state = TurnState::Revealing;
                self.engine.finish_streaming();
            }
        }
        self.sync_state();
    }

    /// Drive the reveal animation one frame.
    pub fn on_frame(&mut self, now: Instant) {
        self.engine.on_frame(now);
        self.sync_state();
    }

    /// Reveal everything that has arrived, immediately.
    pub fn skip_animation(&mut self) {
        self.engine.skip_animation();
        self.sync_state();
    }

    /// Cancel the turn: tear down the engine (cancelling any pending frame
    /// registration) and drop the turn state. No further callbacks fire.
    pub fn teardown(&mut self) {
        self.engine.reset();
        self.turn = None;
    }

    fn sync_state(&mut self) {
        if let Some(turn) = self.turn.as_mut() {
            if turn.state == TurnState::Revealing && self.engine.is_complete() {
                turn.state = if turn.errored {
                    TurnState::Failed
                } else {
                    TurnState::Complete
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame_clock::testing::CountingFrameClock;
    use crate::core::runner::TurnReceipt;

    fn controller() -> (TurnController, CountingFrameClock) {
        let clock = CountingFrameClock::new();
        let controller = TurnController::new(Box::new(clock.clone()), RevealConfig::default());
        (controller, clock)
    }

    fn done(disclaimers: Vec<&str>) -> TurnUpdate {
        TurnUpdate::Completed(TurnReceipt {
            disclaimers: disclaimers.into_iter().map(String::from).collect(),
            follow_ups: Vec::new(),
            errored: false,
        })
    }

    #[test]
    fn streamed_events_assemble_the_reply() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(1);
        controller.handle_update(TurnUpdate::ConversationId("c1".to_string()), 1);
        controller.handle_update(TurnUpdate::Delta("Hello! ".to_string()), 1);
        controller.handle_update(TurnUpdate::Delta("How can I help?".to_string()), 1);
        controller.handle_update(done(vec!["X"]), 1);
        controller.skip_animation();

        assert_eq!(controller.displayed_text(), "Hello! How can I help?");
        let turn = controller.active_turn().unwrap();
        assert_eq!(turn.conversation_id.as_deref(), Some("c1"));
        assert_eq!(turn.disclaimers, vec!["X".to_string()]);
        assert_eq!(turn.state(), TurnState::Complete);
        assert!(controller.is_complete());
        assert!(!controller.is_revealing());
    }

    #[test]
    fn lifecycle_walks_pending_streaming_revealing_complete() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(4);
        assert_eq!(controller.state(), Some(TurnState::Pending));

        controller.handle_update(TurnUpdate::Delta("hi".to_string()), 4);
        assert_eq!(controller.state(), Some(TurnState::Streaming));

        controller.handle_update(done(vec![]), 4);
        assert_eq!(controller.state(), Some(TurnState::Revealing));

        controller.skip_animation();
        assert_eq!(controller.state(), Some(TurnState::Complete));
    }

    #[test]
    fn conversation_id_is_set_exactly_once() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(1);
        controller.handle_update(TurnUpdate::ConversationId("first".to_string()), 1);
        controller.handle_update(TurnUpdate::ConversationId("second".to_string()), 1);
        assert_eq!(
            controller.active_turn().unwrap().conversation_id.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn superseded_turn_updates_are_discarded() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(1);
        controller.handle_update(TurnUpdate::Delta("old".to_string()), 1);

        controller.begin_turn(2);
        controller.handle_update(TurnUpdate::Delta("stale chunk".to_string()), 1);
        controller.handle_update(TurnUpdate::Delta("fresh".to_string()), 2);
        controller.skip_animation();

        assert_eq!(controller.displayed_text(), "fresh");
    }

    #[test]
    fn updates_after_teardown_are_dropped() {
        let (mut controller, clock) = controller();
        controller.begin_turn(1);
        controller.handle_update(TurnUpdate::Delta("text".to_string()), 1);
        controller.teardown();

        controller.handle_update(TurnUpdate::Delta("late".to_string()), 1);
        assert!(controller.active_turn().is_none());
        assert_eq!(controller.displayed_text(), "");
        // The pending frame registration was cancelled exactly once.
        assert_eq!(clock.cancelled().len(), 1);
        assert_eq!(clock.double_cancels(), 0);
    }

    #[test]
    fn restart_replaces_partial_content_with_fallback_reply() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(1);
        controller.handle_update(TurnUpdate::Delta("half an ans".to_string()), 1);
        controller.handle_update(TurnUpdate::RestartContent, 1);
        controller.handle_update(TurnUpdate::Delta("whole answer".to_string()), 1);
        controller.handle_update(done(vec![]), 1);
        controller.skip_animation();

        assert_eq!(controller.displayed_text(), "whole answer");
        assert_eq!(controller.state(), Some(TurnState::Complete));
    }

    #[test]
    fn errored_receipt_lands_in_failed_state() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(1);
        controller.handle_update(TurnUpdate::Delta("apology text".to_string()), 1);
        controller.handle_update(
            TurnUpdate::Completed(TurnReceipt {
                errored: true,
                ..TurnReceipt::default()
            }),
            1,
        );
        controller.skip_animation();

        assert_eq!(controller.state(), Some(TurnState::Failed));
        // The text still renders through the normal path.
        assert_eq!(controller.displayed_text(), "apology text");
    }

    #[test]
    fn completion_waits_for_the_display_to_catch_up() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(1);
        controller.handle_update(TurnUpdate::Delta("slow reveal".to_string()), 1);
        controller.handle_update(done(vec![]), 1);

        // Streaming is done but nothing has been revealed yet.
        assert_eq!(controller.state(), Some(TurnState::Revealing));
        assert!(!controller.is_complete());
        assert!(controller.is_revealing());

        controller.skip_animation();
        assert!(controller.is_complete());
    }

    #[test]
    fn sources_pass_through_opaquely() {
        let (mut controller, _clock) = controller();
        controller.begin_turn(1);
        let payload = serde_json::json!([{"url": "https://example.invalid"}]);
        controller.handle_update(TurnUpdate::Sources(payload.clone()), 1);
        assert_eq!(controller.active_turn().unwrap().sources, vec![payload]);
    }
}
