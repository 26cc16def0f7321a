//! Google Gemini backend implementation.
//!
//! Talks to the Generative Language REST API directly:
//! - API key as a query parameter (no auth header)
//! - `systemInstruction` as a top-level request field
//! - Streaming via `streamGenerateContent?alt=sse`, one JSON response per
//!   `data:` line
//! - Document OCR via non-streaming `generateContent` with `inlineData`
//!
//! The same backend value serves both roles: opening chat sessions and
//! extracting document text.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tanyahr_core::backend::{ChatBackend, ChatSession, FragmentStream, SessionSeed, Turn, TurnRole};
use tanyahr_core::error::{ExtractionError, SessionInitError, StreamError};
use tanyahr_core::extract::ContentExtractor;
use tracing::{debug, trace, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Verbatim-OCR instruction sent alongside the document bytes.
const EXTRACTION_PROMPT: &str = "Bertindaklah sebagai OCR yang sangat akurat. Ekstrak seluruh teks dari dokumen ini secara verbatim (kata per kata). Jangan buat ringkasan. Keluarkan hanya teks mentahnya saja agar bisa disimpan ke database";

/// Gemini REST backend.
pub struct GeminiBackend {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// Create a new Gemini backend with the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different Gemini model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Convert prior conversation turns to wire contents.
    fn to_wire_history(history: &[Turn]) -> Vec<Content> {
        history
            .iter()
            .map(|turn| Content {
                role: Some(
                    match turn.role {
                        TurnRole::User => "user",
                        TurnRole::Model => "model",
                    }
                    .into(),
                ),
                parts: vec![Part::text(&turn.text)],
            })
            .collect()
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_session(
        &self,
        seed: SessionSeed,
    ) -> Result<Box<dyn ChatSession>, SessionInitError> {
        if self.api_key.trim().is_empty() {
            return Err(SessionInitError::NotConfigured(
                "Gemini API key is not set".into(),
            ));
        }

        debug!(
            backend = %self.name,
            model = %self.model,
            history_turns = seed.history.len(),
            "Opening Gemini session"
        );

        Ok(Box::new(GeminiSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: seed.temperature,
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(&seed.system_instruction)],
            },
            contents: Self::to_wire_history(&seed.history),
            pending_user: None,
        }))
    }
}

#[async_trait]
impl ContentExtractor for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract_text(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> Result<String, ExtractionError> {
        if !mime_type.contains("pdf") && !mime_type.contains("image") {
            return Err(ExtractionError::UnsupportedType(mime_type.into()));
        }
        // Non-PDF document types are treated as PDF; the vision model copes
        // and the extraction stays consistent across sources.
        let wire_mime = if mime_type.contains("pdf") {
            "application/pdf"
        } else {
            mime_type
        };

        let request = GenerateRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: wire_mime.into(),
                            data: BASE64.encode(data),
                        }),
                    },
                    Part::text(EXTRACTION_PROMPT),
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };

        debug!(mime_type, bytes = data.len(), "Extracting document text");

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Gemini extraction error");
            return Err(ExtractionError::ApiError {
                status_code: status,
                message: body,
            });
        }

        let api_resp: GenerateResponse = response.json().await.map_err(|e| {
            ExtractionError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Gemini response: {e}"),
            }
        })?;

        let text = api_resp.text();
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyResult);
        }
        Ok(text)
    }
}

/// One live Gemini chat session.
///
/// Holds the full wire history locally; every send replays it plus the new
/// message. Completed turns enter the history only through `record_reply`,
/// so a failed turn leaves it untouched. The session is only as valid as
/// the instruction it was opened with, which is why the engine rebuilds on
/// context change instead of mutating this.
pub struct GeminiSession {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    system_instruction: Content,
    contents: Vec<Content>,
    /// The message of the turn in flight, recorded alongside its reply.
    pending_user: Option<String>,
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send(&mut self, message: &str) -> Result<FragmentStream, StreamError> {
        let mut contents = self.contents.clone();
        contents.push(Content {
            role: Some("user".into()),
            parts: vec![Part::text(message)],
        });

        let request = GenerateRequest {
            contents,
            system_instruction: Some(self.system_instruction.clone()),
            generation_config: Some(GenerationConfig {
                temperature: self.temperature,
            }),
        };

        debug!(model = %self.model, turns = request.contents.len(), "Sending streaming request");

        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(StreamError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(StreamError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Gemini API error");
            return Err(StreamError::ApiError {
                status_code: status,
                message: body,
            });
        }

        self.pending_user = Some(message.to_string());

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(StreamError::Interrupted(e.to_string()))).await;
                        return;
                    }
                };

                // Decode per complete line: a multi-byte character split
                // across network chunks must never be lossy-decoded.
                buffer.extend_from_slice(&bytes);

                for line in drain_complete_lines(&mut buffer) {
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let data = data.trim();
                    if data.is_empty() {
                        continue;
                    }

                    let event: GenerateResponse = match serde_json::from_str(data) {
                        Ok(v) => v,
                        Err(e) => {
                            trace!(error = %e, "Ignoring unparseable Gemini SSE event");
                            continue;
                        }
                    };

                    // Metadata-only events carry no text and are skipped.
                    let fragment = event.text();
                    if fragment.is_empty() {
                        continue;
                    }
                    if tx.send(Ok(fragment)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    fn record_reply(&mut self, text: &str) {
        if let Some(user) = self.pending_user.take() {
            self.contents.push(Content {
                role: Some("user".into()),
                parts: vec![Part::text(user)],
            });
        }
        self.contents.push(Content {
            role: Some("model".into()),
            parts: vec![Part::text(text)],
        });
    }
}

/// Split off every complete line in `buffer`, leaving a trailing partial
/// line (possibly ending mid-character) in place for the next chunk.
fn drain_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        lines.push(String::from_utf8_lossy(&line).into_owned());
    }
    lines
}

// --- Gemini API types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        let Some(content) = self.candidates.first().and_then(|c| c.content.as_ref()) else {
            return String::new();
        };
        content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}
