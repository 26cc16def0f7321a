//! # tanyahr Core
//!
//! Domain types, traits, and error definitions for the tanyahr HR assistant.
//! This crate defines the domain model that all other crates implement
//! against: the conversation log, the document collection, the context
//! assembly rules, and the backend/extraction traits.
//!
//! ## Design Philosophy
//!
//! The chat backend and the content extractor are defined as traits here.
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod backend;
pub mod context;
pub mod document;
pub mod error;
pub mod extract;
pub mod message;
pub mod prompt;

// Re-export key types at crate root for ergonomics
pub use backend::{ChatBackend, ChatSession, FragmentStream, SessionSeed, Turn, TurnRole};
pub use context::{assemble, context_changed};
pub use document::{Document, DocumentId, DocumentStore};
pub use error::{ChatError, Error, ExtractionError, Result, SessionInitError, StreamError};
pub use extract::ContentExtractor;
pub use message::{ConversationLog, Message, MessageId, Role};
