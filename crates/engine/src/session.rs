//! Session lifecycle management.
//!
//! A session is valid for sending exactly while its bound context string
//! equals the caller's current context blob. Any mismatch invalidates it and
//! forces recreation, seeded with the prior conversation turns so that
//! conversational continuity is preserved. The backend's session state is
//! not incrementally patchable; full rebuild is the cheapest correct
//! strategy.

use std::sync::Arc;
use tanyahr_core::backend::{ChatBackend, ChatSession, SessionSeed, Turn};
use tanyahr_core::context::context_changed;
use tanyahr_core::error::SessionInitError;
use tanyahr_core::prompt;
use tracing::{debug, trace};

/// Owns the current session handle and the context string it is bound to.
pub struct SessionManager {
    backend: Arc<dyn ChatBackend>,
    temperature: f32,
    bound_context: Option<String>,
    session: Option<Box<dyn ChatSession>>,
}

impl SessionManager {
    /// Create a manager with no active session.
    pub fn new(backend: Arc<dyn ChatBackend>, temperature: f32) -> Self {
        Self {
            backend,
            temperature,
            bound_context: None,
            session: None,
        }
    }

    /// Ensure a session bound to `context` exists.
    ///
    /// If no session exists, or the bound context differs from `context` by
    /// exact string comparison, a new session is created seeded with
    /// `prior_turns`. Otherwise the existing session is kept with no backend
    /// call. On creation failure nothing is stored; the previous session (if
    /// any) is discarded because its context no longer matches.
    pub async fn ensure(
        &mut self,
        context: &str,
        prior_turns: Vec<Turn>,
    ) -> Result<(), SessionInitError> {
        let reusable = match (&self.session, &self.bound_context) {
            (Some(_), Some(bound)) => !context_changed(bound, context),
            _ => false,
        };

        if reusable {
            trace!(backend = self.backend.name(), "Reusing bound session");
            return Ok(());
        }

        debug!(
            backend = self.backend.name(),
            context_len = context.len(),
            seeded_turns = prior_turns.len(),
            "Creating session"
        );

        // Discard first: a half-valid handle must never survive a failed
        // rebuild.
        self.session = None;
        self.bound_context = None;

        let seed = SessionSeed {
            system_instruction: prompt::system_instruction(context),
            history: prior_turns,
            temperature: self.temperature,
        };

        let session = self.backend.open_session(seed).await?;
        self.session = Some(session);
        self.bound_context = Some(context.to_string());
        Ok(())
    }

    /// The active session, if one has been created.
    pub fn session_mut(&mut self) -> Option<&mut Box<dyn ChatSession>> {
        self.session.as_mut()
    }

    /// The context string the active session is bound to.
    pub fn bound_context(&self) -> Option<&str> {
        self.bound_context.as_deref()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}
