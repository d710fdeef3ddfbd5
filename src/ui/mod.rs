//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the main interaction loop. Its render tick is the frame
//!   clock that drives the reveal animation, and it drains delivery updates
//!   from [`crate::core::runner`] between frames.
//! - [`renderer`]: frame composition for the transcript, the in-flight
//!   reveal, the quota banner, and the sign-in prompt.
//!
//! Ownership boundary: this layer presents and captures interaction state;
//! [`crate::core`] owns the pipeline.

pub mod chat_loop;
pub mod renderer;
