//! ChatBackend trait — the abstraction over the text-generation service.
//!
//! A backend knows how to open a conversational session bound to one system
//! instruction and one seeded turn history, and a session knows how to send
//! a message and hand back the reply as a stream of text fragments.
//!
//! The backend is an explicit service object constructed once at process
//! start and passed by `Arc` to whoever needs it — there is no ambient
//! global client.

use crate::error::{SessionInitError, StreamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The role of a turn in the backend's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One prior turn replayed into a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// Everything a new session is bound to at creation time.
#[derive(Debug, Clone)]
pub struct SessionSeed {
    /// Full system instruction (persona + context blob).
    pub system_instruction: String,

    /// Prior turns, order preserved.
    pub history: Vec<Turn>,

    /// Sampling temperature. Low for factual consistency.
    pub temperature: f32,
}

/// The reply to one message, as a finite forward-only sequence of text
/// fragments. Consumed by exactly one reader; no replay. A failure is
/// delivered as one `Err` and ends the sequence; fragments received before
/// it remain valid.
pub type FragmentStream = tokio::sync::mpsc::Receiver<Result<String, StreamError>>;

/// A conversational session held by the backend.
///
/// Sessions accumulate their own turn state, but only for completed turns:
/// the caller reports the assembled reply through `record_reply` once the
/// stream completed cleanly, and the session records the user turn together
/// with it. A failed turn leaves the replay history untouched.
#[async_trait]
pub trait ChatSession: Send {
    /// Send one message and stream the reply.
    ///
    /// Each call represents one logical turn and is not restartable.
    /// Fragments with no textual payload are filtered out by the
    /// implementation and never yielded.
    async fn send(&mut self, message: &str) -> Result<FragmentStream, StreamError>;

    /// Record a successfully completed turn: the message last sent together
    /// with its full reply text.
    fn record_reply(&mut self, text: &str);
}

/// The backend text-generation service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "gemini").
    fn name(&self) -> &str;

    /// Open a new session bound to the given seed.
    async fn open_session(
        &self,
        seed: SessionSeed,
    ) -> Result<Box<dyn ChatSession>, SessionInitError>;
}
