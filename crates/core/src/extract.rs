//! ContentExtractor trait — the black-box "content extraction" collaborator.
//!
//! Document source providers (manual paste, local file read, cloud listing)
//! supply raw bytes plus a title; this trait turns the bytes into plain text
//! or fails with `ExtractionError`. Ingestion protocol, authentication, and
//! file-format decoding are the implementation's concern.

use crate::error::ExtractionError;
use async_trait::async_trait;

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// A human-readable name for this extractor.
    fn name(&self) -> &str;

    /// Extract plain text from raw document bytes.
    async fn extract_text(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> Result<String, ExtractionError>;
}
