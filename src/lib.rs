//! Patter is a terminal chat client that renders assistant replies as they
//! arrive from a remote chat service, with a typewriter reveal that runs
//! independently of network timing.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the delivery pipeline: the streaming transport consumer
//!   and its fallback ladder, the reveal engine, per-turn coordination, and
//!   session gating for anonymous usage.
//! - [`ui`] renders the terminal interface and runs the interactive loop
//!   whose render tick drives the reveal animation.
//! - [`api`] defines the wire payloads exchanged with the chat service.
//! - [`utils`] holds URL construction and transcript-logging helpers.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`), which
//! parses flags, loads configuration, and hands off to
//! [`ui::chat_loop::run`].

pub mod api;
pub mod core;
pub mod ui;
pub mod utils;
