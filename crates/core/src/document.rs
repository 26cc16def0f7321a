//! Knowledge document types and the in-memory document collection.
//!
//! Documents are immutable once stored except for deletion. The collection
//! owns them exclusively and preserves insertion order — the order the
//! context blob is assembled in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a knowledge document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A knowledge document supplied as grounding material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: DocumentId,

    /// Human-readable title, used in the context block markers
    pub title: String,

    /// Raw text content, treated as opaque (never parsed)
    pub content: String,

    /// When the document was added
    pub added_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            title: title.into(),
            content: content.into(),
            added_at: Utc::now(),
        }
    }
}

/// In-memory, insertion-ordered collection of knowledge documents.
///
/// All state is process-local and ephemeral; nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, returning its id.
    pub fn add(&mut self, title: impl Into<String>, content: impl Into<String>) -> DocumentId {
        let doc = Document::new(title, content);
        let id = doc.id.clone();
        self.documents.push(doc);
        id
    }

    /// Remove a document by id. Returns true if something was removed.
    pub fn remove(&mut self, id: &DocumentId) -> bool {
        let len_before = self.documents.len();
        self.documents.retain(|d| &d.id != id);
        self.documents.len() < len_before
    }

    /// The documents in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The current context blob, recomputed from the collection.
    pub fn context(&self) -> String {
        crate::context::assemble(&self.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove() {
        let mut store = DocumentStore::new();
        let id = store.add("SOP Cuti", "Isi dokumen");
        assert_eq!(store.len(), 1);

        assert!(store.remove(&id));
        assert!(store.is_empty());
        assert!(!store.remove(&id));
    }

    #[test]
    fn insertion_order_preserved() {
        let mut store = DocumentStore::new();
        store.add("A", "a");
        store.add("B", "b");
        store.add("C", "c");

        let titles: Vec<&str> = store.documents().iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn context_tracks_collection() {
        let mut store = DocumentStore::new();
        assert_eq!(store.context(), "");

        let id = store.add("SOP", "isi");
        assert!(store.context().contains("SOP"));

        store.remove(&id);
        assert_eq!(store.context(), "");
    }
}
