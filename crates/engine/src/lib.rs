//! # tanyahr Engine
//!
//! The coordinating layer between the document collection, the conversation
//! log, and the chat backend. Owns the single-turn-at-a-time state machine
//! and the session rebuild-on-context-change policy.

pub mod engine;
pub mod event;
pub mod session;

pub use engine::{ChatEngine, TurnState};
pub use event::TurnEvent;
pub use session::SessionManager;
