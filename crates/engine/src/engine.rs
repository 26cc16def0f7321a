//! The chat engine — one coordinating component owning the shared state.
//!
//! The engine holds the document collection, the conversation log, and the
//! session handle, and drives the per-turn state machine:
//!
//! `Idle → UserSubmitted → AwaitingFirstFragment → Streaming → Idle`
//!
//! with a transition to failure from any point after `UserSubmitted`. A
//! single logical turn is in flight at a time; submissions while busy are
//! rejected, not queued. All backend failures are caught at the turn
//! boundary: the pending entry is finalized with the fixed apology text and
//! `submit` still returns the reply id.

use crate::event::TurnEvent;
use crate::session::SessionManager;
use std::sync::Arc;
use tanyahr_core::backend::{ChatBackend, Turn};
use tanyahr_core::document::{Document, DocumentId, DocumentStore};
use tanyahr_core::error::{ChatError, Error, StreamError};
use tanyahr_core::message::{ConversationLog, MessageId};
use tanyahr_core::prompt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where the current turn is in its lifecycle.
///
/// Completion and failure are transitions back to `Idle`, not resting
/// states; an idle engine is always ready for the next submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    UserSubmitted,
    AwaitingFirstFragment,
    Streaming,
}

/// The coordinating component for one conversation.
pub struct ChatEngine {
    documents: DocumentStore,
    log: ConversationLog,
    sessions: SessionManager,
    state: TurnState,
    events: Option<mpsc::Sender<TurnEvent>>,
}

impl ChatEngine {
    /// Create an engine talking to the given backend.
    pub fn new(backend: Arc<dyn ChatBackend>, temperature: f32) -> Self {
        Self {
            documents: DocumentStore::new(),
            log: ConversationLog::new(),
            sessions: SessionManager::new(backend, temperature),
            state: TurnState::Idle,
            events: None,
        }
    }

    /// Attach a sender for turn progress events.
    pub fn with_events(mut self, tx: mpsc::Sender<TurnEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    // --- Knowledge base ---

    /// Add a knowledge document.
    pub fn add_document(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> DocumentId {
        let id = self.documents.add(title, content);
        debug!(document_id = %id, total = self.documents.len(), "Document added");
        id
    }

    /// Remove a knowledge document. Returns true if something was removed.
    pub fn remove_document(&mut self, id: &DocumentId) -> bool {
        let removed = self.documents.remove(id);
        if removed {
            debug!(document_id = %id, total = self.documents.len(), "Document removed");
        }
        removed
    }

    pub fn documents(&self) -> &[Document] {
        self.documents.documents()
    }

    // --- Conversation ---

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != TurnState::Idle
    }

    /// Start a new conversation: clears the log only.
    ///
    /// Deliberately does not invalidate the session — if the context has not
    /// changed, the next submission reuses it.
    pub fn reset(&mut self) {
        info!(messages = self.log.len(), "Conversation reset");
        self.log.reset();
    }

    /// Submit one user message and drive the turn to completion.
    ///
    /// Returns the id of the reply entry, which is finalized either with the
    /// streamed text or, on any backend failure, with the fixed apology
    /// message and `failed = true`. Only protocol violations (busy engine,
    /// empty text) are returned as errors.
    pub async fn submit(&mut self, text: &str) -> Result<MessageId, ChatError> {
        if self.is_busy() {
            return Err(ChatError::NotReady);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.state = TurnState::UserSubmitted;

        // Snapshot before this turn's entries: the new session, if one is
        // needed, replays only prior turns.
        let prior = self.log.turns();
        let context = self.documents.context();

        let user_id = self.log.append_user(text);
        let reply_id = self.log.append_pending_reply();
        self.emit(TurnEvent::Started {
            user_id,
            reply_id: reply_id.clone(),
        })
        .await;

        match self.run_turn(&context, prior, text, &reply_id).await {
            Ok(full_text) => {
                self.log.finalize(&reply_id);
                if let Some(session) = self.sessions.session_mut() {
                    session.record_reply(&full_text);
                }
                info!(reply_len = full_text.len(), "Turn completed");
                self.emit(TurnEvent::Completed {
                    reply_id: reply_id.clone(),
                    text: full_text,
                })
                .await;
            }
            Err(err) => {
                warn!(error = %err, "Turn failed");
                self.log.finalize_error(&reply_id, prompt::ERROR_REPLY);
                self.emit(TurnEvent::Failed {
                    reply_id: reply_id.clone(),
                    message: prompt::ERROR_REPLY.into(),
                })
                .await;
            }
        }

        self.state = TurnState::Idle;
        Ok(reply_id)
    }

    /// Everything between session ensure and end-of-stream. Any error here
    /// fails the turn; fragments already appended stay in the log until the
    /// caller finalizes the entry.
    async fn run_turn(
        &mut self,
        context: &str,
        prior: Vec<Turn>,
        text: &str,
        reply_id: &MessageId,
    ) -> Result<String, Error> {
        self.sessions.ensure(context, prior).await?;

        let mut rx = {
            let session = self.sessions.session_mut().ok_or_else(|| {
                StreamError::InvalidSession("chat session missing after initialization".into())
            })?;
            session.send(text).await?
        };
        self.state = TurnState::AwaitingFirstFragment;

        let mut full_text = String::new();
        while let Some(item) = rx.recv().await {
            let fragment = item?;
            self.state = TurnState::Streaming;
            full_text.push_str(&fragment);
            self.log.append_fragment(reply_id, &fragment);
            self.emit(TurnEvent::Fragment {
                reply_id: reply_id.clone(),
                text: fragment,
            })
            .await;
        }

        Ok(full_text)
    }

    async fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.events {
            // A dropped or lagging listener never fails a turn.
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tanyahr_core::backend::{ChatSession, FragmentStream, SessionSeed};
    use tanyahr_core::error::SessionInitError;
    use tanyahr_core::message::Role;

    /// Scripted backend: every session replays the same fragment script.
    struct ScriptedBackend {
        script: Vec<Result<String, StreamError>>,
        opened: AtomicUsize,
        seeds: Mutex<Vec<SessionSeed>>,
        fail_open: bool,
        recorded_replies: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedBackend {
        fn ok(fragments: &[&str]) -> Self {
            Self {
                script: fragments.iter().map(|f| Ok(f.to_string())).collect(),
                opened: AtomicUsize::new(0),
                seeds: Mutex::new(Vec::new()),
                fail_open: false,
                recorded_replies: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing_mid_stream(fragments: &[&str]) -> Self {
            let mut script: Vec<Result<String, StreamError>> =
                fragments.iter().map(|f| Ok(f.to_string())).collect();
            script.push(Err(StreamError::Interrupted("connection reset".into())));
            Self {
                script,
                ..Self::ok(&[])
            }
        }

        fn failing_open() -> Self {
            Self {
                fail_open: true,
                ..Self::ok(&[])
            }
        }
    }

    struct ScriptedSession {
        script: Vec<Result<String, StreamError>>,
        recorded_replies: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ChatSession for ScriptedSession {
        async fn send(&mut self, _message: &str) -> Result<FragmentStream, StreamError> {
            let (tx, rx) = tokio::sync::mpsc::channel(self.script.len().max(1));
            for item in self.script.clone() {
                let stop = item.is_err();
                tx.try_send(item).expect("script channel sized to fit");
                if stop {
                    break;
                }
            }
            Ok(rx)
        }

        fn record_reply(&mut self, text: &str) {
            self.recorded_replies.lock().unwrap().push(text.to_string());
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn open_session(
            &self,
            seed: SessionSeed,
        ) -> Result<Box<dyn ChatSession>, SessionInitError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.seeds.lock().unwrap().push(seed);
            if self.fail_open {
                return Err(SessionInitError::AuthenticationFailed("bad key".into()));
            }
            Ok(Box::new(ScriptedSession {
                script: self.script.clone(),
                recorded_replies: self.recorded_replies.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn fragments_accumulate_into_final_entry() {
        let backend = Arc::new(ScriptedBackend::ok(&["Sela", "mat ", "pagi"]));
        let mut engine = ChatEngine::new(backend.clone(), 0.3);

        let reply_id = engine.submit("Bagaimana prosedur cuti?").await.unwrap();

        let reply = engine.log().get(&reply_id).unwrap();
        assert_eq!(reply.text, "Selamat pagi");
        assert_eq!(reply.role, Role::Assistant);
        assert!(!reply.failed);
        assert_eq!(engine.state(), TurnState::Idle);
        assert!(engine.log().pending_id().is_none());

        // The full reply was reported back to the session.
        assert_eq!(
            backend.recorded_replies.lock().unwrap().as_slice(),
            ["Selamat pagi"]
        );
    }

    #[tokio::test]
    async fn empty_knowledge_base_scenario() {
        let backend = Arc::new(ScriptedBackend::ok(&["Prosedur cuti diatur ..."]));
        let mut engine = ChatEngine::new(backend.clone(), 0.3);

        engine.submit("Bagaimana prosedur cuti?").await.unwrap();

        let seeds = backend.seeds.lock().unwrap();
        assert_eq!(seeds.len(), 1);
        assert!(seeds[0].system_instruction.contains(prompt::NO_DATA_PLACEHOLDER));
        assert!(seeds[0].history.is_empty(), "no prior turns on first send");
    }

    #[tokio::test]
    async fn session_reused_while_context_unchanged() {
        let backend = Arc::new(ScriptedBackend::ok(&["jawaban"]));
        let mut engine = ChatEngine::new(backend.clone(), 0.3);
        engine.add_document("SOP Cuti", "Pengajuan cuti maksimal H-7.");

        engine.submit("pertanyaan satu").await.unwrap();
        engine.submit("pertanyaan dua").await.unwrap();

        assert_eq!(backend.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn context_change_rebuilds_session_with_prior_turns() {
        let backend = Arc::new(ScriptedBackend::ok(&["jawaban"]));
        let mut engine = ChatEngine::new(backend.clone(), 0.3);

        engine.submit("pertanyaan satu").await.unwrap();
        engine.add_document("SOP Baru", "isi");
        engine.submit("pertanyaan dua").await.unwrap();

        assert_eq!(backend.opened.load(Ordering::SeqCst), 2);

        let seeds = backend.seeds.lock().unwrap();
        // Second session replays the completed first turn, not the new one.
        assert_eq!(seeds[1].history.len(), 2);
        assert_eq!(seeds[1].history[0].text, "pertanyaan satu");
        assert_eq!(seeds[1].history[1].text, "jawaban");
        assert!(seeds[1].system_instruction.contains("SOP Baru"));
    }

    #[tokio::test]
    async fn mid_stream_failure_replaces_partial_with_apology() {
        let backend = Arc::new(ScriptedBackend::failing_mid_stream(&["Ha", "lo"]));
        let mut engine = ChatEngine::new(backend, 0.3);

        let reply_id = engine.submit("halo").await.unwrap();

        let reply = engine.log().get(&reply_id).unwrap();
        assert_eq!(reply.text, prompt::ERROR_REPLY);
        assert!(reply.failed);
        assert_eq!(engine.state(), TurnState::Idle);
        // Log ordering intact: user entry then failed reply.
        assert_eq!(engine.log().len(), 2);
        assert_eq!(engine.log().messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn session_init_failure_finalizes_with_apology() {
        let backend = Arc::new(ScriptedBackend::failing_open());
        let mut engine = ChatEngine::new(backend, 0.3);

        let reply_id = engine.submit("halo").await.unwrap();

        let reply = engine.log().get(&reply_id).unwrap();
        assert_eq!(reply.text, prompt::ERROR_REPLY);
        assert!(reply.failed);
    }

    #[tokio::test]
    async fn failed_turn_records_no_reply_on_session() {
        let backend = Arc::new(ScriptedBackend::failing_mid_stream(&["Ha"]));
        let recorded = backend.recorded_replies.clone();
        let mut engine = ChatEngine::new(backend, 0.3);

        engine.submit("halo").await.unwrap();
        assert!(recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_submission_rejected() {
        let backend = Arc::new(ScriptedBackend::ok(&["x"]));
        let mut engine = ChatEngine::new(backend, 0.3);

        let err = engine.submit("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert!(engine.log().is_empty());
    }

    #[tokio::test]
    async fn reset_clears_log_but_keeps_session() {
        let backend = Arc::new(ScriptedBackend::ok(&["jawaban"]));
        let mut engine = ChatEngine::new(backend.clone(), 0.3);

        engine.submit("pertanyaan").await.unwrap();
        engine.reset();
        assert!(engine.log().is_empty());

        engine.submit("pertanyaan baru").await.unwrap();
        // Context unchanged: the old session is reused across the reset.
        assert_eq!(backend.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn events_trace_the_turn() {
        let backend = Arc::new(ScriptedBackend::ok(&["a", "b"]));
        let (tx, mut rx) = mpsc::channel(16);
        let mut engine = ChatEngine::new(backend, 0.3).with_events(tx);

        engine.submit("halo").await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.event_type());
        }
        assert_eq!(names, ["started", "fragment", "fragment", "completed"]);
    }

    #[tokio::test]
    async fn failure_event_carries_apology() {
        let backend = Arc::new(ScriptedBackend::failing_open());
        let (tx, mut rx) = mpsc::channel(16);
        let mut engine = ChatEngine::new(backend, 0.3).with_events(tx);

        engine.submit("halo").await.unwrap();

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        match last {
            Some(TurnEvent::Failed { message, .. }) => assert_eq!(message, prompt::ERROR_REPLY),
            other => panic!("Expected failed event, got {other:?}"),
        }
    }
}
