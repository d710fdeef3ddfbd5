pub mod app;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod frame_clock;
pub mod gate;
pub mod message;
pub mod reveal;
pub mod runner;
pub mod session;
pub mod turn;
