//! # tanyahr Providers
//!
//! Backend implementations of the core `ChatBackend` and `ContentExtractor`
//! traits. Currently Google Gemini only.

pub mod gemini;

pub use gemini::{DEFAULT_MODEL, GeminiBackend, GeminiSession};
