//! Turn-level progress events.
//!
//! `TurnEvent` lets an outer surface (CLI, web, tests) render a reply
//! incrementally while the engine fills the pending log entry. Purely
//! observational: the conversation log is the source of truth.

use serde::{Deserialize, Serialize};
use tanyahr_core::message::MessageId;

/// Events emitted by the engine while a turn is in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A user entry and its pending reply entry were appended.
    Started {
        user_id: MessageId,
        reply_id: MessageId,
    },

    /// One fragment was appended to the pending entry.
    Fragment { reply_id: MessageId, text: String },

    /// The reply completed; `text` is the full accumulated reply.
    Completed { reply_id: MessageId, text: String },

    /// The turn failed; the pending entry was finalized with `message`.
    Failed { reply_id: MessageId, message: String },
}

impl TurnEvent {
    /// Stable event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Fragment { .. } => "fragment",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_serialization() {
        let event = TurnEvent::Fragment {
            reply_id: MessageId("m1".into()),
            text: "Halo".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"fragment""#));
        assert!(json.contains(r#""text":"Halo""#));
    }

    #[test]
    fn event_type_names() {
        let id = MessageId("m".into());
        assert_eq!(
            TurnEvent::Started {
                user_id: id.clone(),
                reply_id: id.clone()
            }
            .event_type(),
            "started"
        );
        assert_eq!(
            TurnEvent::Failed {
                reply_id: id,
                message: "x".into()
            }
            .event_type(),
            "failed"
        );
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"completed","reply_id":"m9","text":"done"}"#;
        let event: TurnEvent = serde_json::from_str(json).unwrap();
        match event {
            TurnEvent::Completed { reply_id, text } => {
                assert_eq!(reply_id.0, "m9");
                assert_eq!(text, "done");
            }
            _ => panic!("Wrong variant"),
        }
    }
}
