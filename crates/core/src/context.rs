//! Context assembly — documents to a single grounding blob.
//!
//! Pure and deterministic: identical input collections always produce
//! identical output, and the output order is exactly the input order.
//! Content is treated as opaque text, never parsed.

use crate::document::Document;

/// Start marker prefix for a document block; the title follows.
pub const DOC_START_PREFIX: &str = "--- MULAI DOKUMEN: ";
/// Start marker suffix, after the title.
pub const DOC_START_SUFFIX: &str = " ---";
/// End marker for a document block.
pub const DOC_END: &str = "--- AKHIR DOKUMEN ---";

/// Concatenate the documents into one context blob.
///
/// Empty input yields the empty string. Otherwise every document is rendered
/// as a labeled block (start marker with title, raw content, end marker) and
/// blocks are joined so consecutive blocks are separated by exactly one
/// blank line.
pub fn assemble(documents: &[Document]) -> String {
    if documents.is_empty() {
        return String::new();
    }

    documents
        .iter()
        .map(|doc| {
            format!(
                "{}{}{}\n{}\n{}\n",
                DOC_START_PREFIX, doc.title, DOC_START_SUFFIX, doc.content, DOC_END
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a session bound to `old` is stale for the current blob `new`.
///
/// Exact string comparison. Kept as a named predicate so the re-init
/// heuristic can be tested independently of the backend.
pub fn context_changed(old: &str, new: &str) -> bool {
    old != new
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collection_yields_empty_blob() {
        assert_eq!(assemble(&[]), "");
    }

    #[test]
    fn single_document_is_framed() {
        let docs = vec![Document::new("SOP Cuti", "Pengajuan cuti maksimal H-7.")];
        let blob = assemble(&docs);
        assert_eq!(
            blob,
            "--- MULAI DOKUMEN: SOP Cuti ---\nPengajuan cuti maksimal H-7.\n--- AKHIR DOKUMEN ---\n"
        );
    }

    #[test]
    fn blocks_keep_input_order_with_one_blank_line() {
        let docs = vec![Document::new("A", "isi a"), Document::new("B", "isi b")];
        let blob = assemble(&docs);

        let a_end = blob.find("isi a").unwrap();
        let b_start = blob.find("--- MULAI DOKUMEN: B ---").unwrap();
        assert!(a_end < b_start, "A's block must fully precede B's");

        // One trailing newline on A's block + one join newline = one blank line.
        assert!(blob.contains("--- AKHIR DOKUMEN ---\n\n--- MULAI DOKUMEN: B ---"));
        assert!(!blob.contains("--- AKHIR DOKUMEN ---\n\n\n"));
    }

    #[test]
    fn reordering_changes_output_deterministically() {
        let a = Document::new("A", "a");
        let b = Document::new("B", "b");

        let forward = assemble(&[a.clone(), b.clone()]);
        let backward = assemble(&[b, a]);

        assert_ne!(forward, backward);
        assert!(forward.find("A ---").unwrap() < forward.find("B ---").unwrap());
        assert!(backward.find("B ---").unwrap() < backward.find("A ---").unwrap());
    }

    #[test]
    fn change_predicate_is_exact_comparison() {
        assert!(!context_changed("", ""));
        assert!(!context_changed("abc", "abc"));
        assert!(context_changed("abc", "abc "));
        assert!(context_changed("abc", ""));
    }
}
