//! Typewriter reveal of streamed assistant text.
//!
//! Text arrives in network-sized chunks but is shown one character at a
//! time. The engine keeps two views of the same buffer: everything that has
//! arrived (`full_text`) and the lagging prefix the user actually sees
//! (`displayed_text`). Frames advance the lag at a configured per-character
//! delay, flushing to the visible prefix in small batches so render cost
//! stays bounded no matter how long the reply grows.
//!
//! A turn is complete only when the transport said "no more input" *and*
//! the display has caught up. End-of-stream alone would finish a turn while
//! characters are still being revealed.

use std::time::{Duration, Instant};

use unicode_segmentation::UnicodeSegmentation;

use crate::core::constants::{DEFAULT_CHAR_DELAY_MS, DEFAULT_REVEAL_BATCH};
use crate::core::frame_clock::{FrameClock, FrameRegistration};

/// Tuning for the reveal animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealConfig {
    /// Minimum time between two revealed characters.
    pub char_delay: Duration,
    /// Revealed characters buffered before a display flush. Whitespace and
    /// end-of-input flush early so the display never sticks mid-word.
    pub batch_size: usize,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            char_delay: Duration::from_millis(DEFAULT_CHAR_DELAY_MS),
            batch_size: DEFAULT_REVEAL_BATCH,
        }
    }
}

pub struct RevealEngine {
    clock: Box<dyn FrameClock>,
    config: RevealConfig,
    input: String,
    /// Byte length of the flushed, visible prefix of `input`.
    displayed: usize,
    /// Byte length of the consumed prefix; `displayed <= revealed` always,
    /// the gap being the unflushed batch.
    revealed: usize,
    /// Graphemes consumed since the last flush.
    batched: usize,
    streaming_done: bool,
    completion_fired: bool,
    on_complete: Option<Box<dyn FnMut()>>,
    pending_frame: Option<FrameRegistration>,
    last_tick: Option<Instant>,
    carry: Duration,
}

impl RevealEngine {
    pub fn new(clock: Box<dyn FrameClock>, config: RevealConfig) -> Self {
        Self {
            clock,
            config,
            input: String::new(),
            displayed: 0,
            revealed: 0,
            batched: 0,
            streaming_done: false,
            completion_fired: false,
            on_complete: None,
            pending_frame: None,
            last_tick: None,
            carry: Duration::ZERO,
        }
    }

    /// Register the callback invoked when the turn completes. Fires at most
    /// once per turn; cleared by [`RevealEngine::reset`].
    pub fn set_on_complete(&mut self, callback: impl FnMut() + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// The lagging prefix currently shown to the user.
    pub fn displayed_text(&self) -> &str {
        &self.input[..self.displayed]
    }

    /// Everything that has arrived, shown or not.
    pub fn full_text(&self) -> &str {
        &self.input
    }

    pub fn streaming_done(&self) -> bool {
        self.streaming_done
    }

    /// True iff no more input is coming *and* the display caught up.
    pub fn is_complete(&self) -> bool {
        self.streaming_done && self.displayed == self.input.len()
    }

    /// True while the display lags the buffer, or while more input may still
    /// arrive.
    pub fn is_animating(&self) -> bool {
        self.displayed < self.input.len() || !self.streaming_done
    }

    /// Extend the input buffer. Empty chunks are valid no-ops.
    pub fn append_text(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.input.push_str(chunk);
        self.arm();
    }

    /// Mark the input as final. Completion is evaluated on the next frame so
    /// that it always happens in tick order, even when the display already
    /// caught up.
    pub fn finish_streaming(&mut self) {
        self.streaming_done = true;
        self.arm();
    }

    /// Reveal everything that has arrived, immediately.
    pub fn skip_animation(&mut self) {
        self.revealed = self.input.len();
        self.flush();
        self.carry = Duration::ZERO;
        self.last_tick = None;
        self.disarm();
        if self.streaming_done {
            self.fire_completion();
        }
    }

    /// Discard accumulated and displayed text while keeping the completion
    /// callback. Used when a failed delivery restarts the turn's content.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.displayed = 0;
        self.revealed = 0;
        self.batched = 0;
        self.streaming_done = false;
        self.carry = Duration::ZERO;
        self.last_tick = None;
        self.disarm();
    }

    /// Clear all state for reuse on a new turn: buffers, completion flag,
    /// callback, and any outstanding frame registration.
    pub fn reset(&mut self) {
        self.clear_input();
        self.completion_fired = false;
        self.on_complete = None;
    }

    /// Advance the animation for the frame at `now`. Ticks arriving with no
    /// registration armed are ignored.
    pub fn on_frame(&mut self, now: Instant) {
        if self.pending_frame.take().is_none() {
            return;
        }

        let elapsed = match self.last_tick {
            Some(previous) => now.saturating_duration_since(previous),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        self.carry += elapsed;

        while self.revealed < self.input.len() && self.carry >= self.config.char_delay {
            self.carry -= self.config.char_delay;
            self.advance_one();
        }

        if self.revealed == self.input.len() {
            self.flush();
            // Starved: don't let waiting time pile up into a burst once
            // input resumes.
            if self.carry > self.config.char_delay {
                self.carry = self.config.char_delay;
            }
            if self.streaming_done {
                self.fire_completion();
                self.last_tick = None;
                return;
            }
        }

        self.arm();
    }

    /// Consume one grapheme cluster so multi-byte glyphs and combining
    /// sequences are never split across the displayed boundary.
    fn advance_one(&mut self) {
        let Some(grapheme) = self.input[self.revealed..].graphemes(true).next() else {
            return;
        };
        let is_break = grapheme.chars().all(char::is_whitespace);
        self.revealed += grapheme.len();
        self.batched += 1;
        if self.batched >= self.config.batch_size || is_break || self.revealed == self.input.len() {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.displayed = self.revealed;
        self.batched = 0;
    }

    fn fire_completion(&mut self) {
        if self.completion_fired {
            return;
        }
        self.completion_fired = true;
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }

    fn arm(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.clock.schedule());
        }
    }

    fn disarm(&mut self) {
        if let Some(registration) = self.pending_frame.take() {
            self.clock.cancel(registration);
        }
    }
}
