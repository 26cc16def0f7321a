//! Message and ConversationLog domain types.
//!
//! The log is append-only with one relaxed-mutation exception: the most
//! recent assistant entry may be filled in-place by streamed fragments while
//! it is *pending*. Once finalized (successfully or with an error) it is
//! immutable like every other entry.

use crate::backend::{Turn, TurnRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

/// Unique identifier for a message in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

/// A single message in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,

    /// Who sent this message
    pub role: Role,

    /// The text content. Grows fragment-by-fragment while pending.
    pub text: String,

    /// Timestamp
    pub created_at: DateTime<Utc>,

    /// True when the entry was finalized with an error.
    pub failed: bool,
}

impl Message {
    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
            failed: false,
        }
    }

    /// Create an empty assistant message, to be filled by fragments.
    pub fn pending_reply() -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            text: String::new(),
            created_at: Utc::now(),
            failed: false,
        }
    }
}

/// Ordered, appendable log of exchanged messages.
///
/// Insertion order is significant: it defines the turn order fed back to the
/// backend when a session is rebuilt. At most one entry is pending at a time;
/// fragment appends addressed to anything else are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    messages: Vec<Message>,
    /// Id of the entry currently in its mutable phase, if any.
    pending: Option<MessageId>,
}

impl ConversationLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user entry. Always succeeds.
    pub fn append_user(&mut self, text: impl Into<String>) -> MessageId {
        let msg = Message::user(text);
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }

    /// Append an empty assistant entry and mark it pending.
    ///
    /// The caller's turn protocol guarantees at most one pending entry; a
    /// second call simply moves the pending marker to the new entry.
    pub fn append_pending_reply(&mut self) -> MessageId {
        let msg = Message::pending_reply();
        let id = msg.id.clone();
        self.messages.push(msg);
        self.pending = Some(id.clone());
        id
    }

    /// Append `fragment` to the text of the pending entry identified by `id`.
    ///
    /// A no-op if `id` does not refer to the current pending entry — the log
    /// never allows out-of-order or historical mutation. This is also what
    /// drops fragments that arrive after a `reset()`.
    pub fn append_fragment(&mut self, id: &MessageId, fragment: &str) {
        if self.pending.as_ref() != Some(id) {
            trace!(message_id = %id, "Dropping fragment for non-pending entry");
            return;
        }
        if let Some(msg) = self.messages.iter_mut().find(|m| &m.id == id) {
            msg.text.push_str(fragment);
        }
    }

    /// End the pending entry's mutable phase, keeping its accumulated text.
    pub fn finalize(&mut self, id: &MessageId) {
        if self.pending.as_ref() == Some(id) {
            self.pending = None;
        }
    }

    /// Replace the pending entry's text with an error message, mark it
    /// `failed`, and end its mutable phase.
    pub fn finalize_error(&mut self, id: &MessageId, text: impl Into<String>) {
        if self.pending.as_ref() != Some(id) {
            return;
        }
        if let Some(msg) = self.messages.iter_mut().find(|m| &m.id == id) {
            msg.text = text.into();
            msg.failed = true;
        }
        self.pending = None;
    }

    /// Clear the entire log, including the pending marker.
    ///
    /// Independent of document state: starting a new conversation does not
    /// touch the knowledge base.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.pending = None;
    }

    /// The messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Id of the entry currently in its mutable phase, if any.
    pub fn pending_id(&self) -> Option<&MessageId> {
        self.pending.as_ref()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// The log translated into backend turn format, order preserved.
    ///
    /// Empty-text entries (an unfilled pending reply, or a reply that never
    /// received a fragment) are skipped — the backend rejects empty parts.
    pub fn turns(&self) -> Vec<Turn> {
        self.messages
            .iter()
            .filter(|m| !m.text.is_empty())
            .map(|m| Turn {
                role: match m.role {
                    Role::User => TurnRole::User,
                    Role::Assistant => TurnRole::Model,
                },
                text: m.text.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_user_preserves_order() {
        let mut log = ConversationLog::new();
        log.append_user("first");
        log.append_user("second");
        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[0].text, "first");
        assert_eq!(log.messages()[1].text, "second");
    }

    #[test]
    fn fragments_accumulate_on_pending_entry() {
        let mut log = ConversationLog::new();
        log.append_user("Halo");
        let id = log.append_pending_reply();

        log.append_fragment(&id, "Selamat ");
        log.append_fragment(&id, "pagi");

        assert_eq!(log.get(&id).unwrap().text, "Selamat pagi");
        assert!(!log.get(&id).unwrap().failed);
    }

    #[test]
    fn fragment_for_non_pending_id_is_noop() {
        let mut log = ConversationLog::new();
        let user_id = log.append_user("question");
        let reply_id = log.append_pending_reply();
        log.append_fragment(&reply_id, "answer");

        let before: Vec<String> = log.messages().iter().map(|m| m.text.clone()).collect();
        log.append_fragment(&user_id, "tamper");
        log.append_fragment(&MessageId::new(), "ghost");
        let after: Vec<String> = log.messages().iter().map(|m| m.text.clone()).collect();

        assert_eq!(before, after);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn finalize_ends_mutable_phase() {
        let mut log = ConversationLog::new();
        let id = log.append_pending_reply();
        log.append_fragment(&id, "done");
        log.finalize(&id);

        assert!(log.pending_id().is_none());
        log.append_fragment(&id, " more");
        assert_eq!(log.get(&id).unwrap().text, "done");
    }

    #[test]
    fn finalize_error_replaces_partial_text() {
        let mut log = ConversationLog::new();
        let id = log.append_pending_reply();
        log.append_fragment(&id, "Ha");
        log.append_fragment(&id, "lo");

        log.finalize_error(&id, "Maaf, terjadi kesalahan.");

        let msg = log.get(&id).unwrap();
        assert_eq!(msg.text, "Maaf, terjadi kesalahan.");
        assert!(msg.failed);
        assert!(log.pending_id().is_none());
    }

    #[test]
    fn reset_drops_late_fragments() {
        let mut log = ConversationLog::new();
        log.append_user("question");
        let id = log.append_pending_reply();
        log.append_fragment(&id, "partial");

        log.reset();
        assert!(log.is_empty());

        // Fragments still arriving after reset match no entry and are dropped.
        log.append_fragment(&id, "late");
        assert!(log.is_empty());
        assert!(log.pending_id().is_none());
    }

    #[test]
    fn turns_map_roles_and_skip_empty_entries() {
        let mut log = ConversationLog::new();
        log.append_user("Bagaimana prosedur cuti?");
        let id = log.append_pending_reply();
        log.append_fragment(&id, "Prosedurnya ...");
        log.finalize(&id);
        log.append_user("Terima kasih");
        log.append_pending_reply(); // still empty — must be skipped

        let turns = log.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Model);
        assert_eq!(turns[1].text, "Prosedurnya ...");
        assert_eq!(turns[2].text, "Terima kasih");
    }
}
