//! Gemini embedding and generation providers over the Generative Language
//! REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

/// The default Generative Language API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default model for answers and summaries.
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";

/// The default model for embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Dimensionality of `text-embedding-004`.
const DEFAULT_DIMENSIONS: usize = 768;

/// Upper bound on requests per `batchEmbedContents` call.
const MAX_BATCH: usize = 100;

const PROVIDER: &str = "Gemini";

fn require_key(api_key: String) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(RagError::ConfigError(format!("{API_KEY_ENV} must not be empty")));
    }
    Ok(api_key)
}

fn key_from_env() -> Result<String> {
    let key = std::env::var(API_KEY_ENV).map_err(|_| {
        RagError::ConfigError(format!("{API_KEY_ENV} environment variable is required"))
    })?;
    require_key(key)
}

/// Shared HTTP plumbing for both providers.
#[derive(Clone)]
struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    fn new(api_key: String) -> Self {
        Self { http: reqwest::Client::new(), api_key, base_url: DEFAULT_BASE_URL.to_string() }
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url.trim_end_matches('/'))
    }

    /// POST `body` and decode the response, reducing every failure to a message.
    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> std::result::Result<T, String> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self { role: None, parts: vec![Part { text: text.to_string() }] }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    content: Content,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct EmbedValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbedValues>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// Single texts are embedded as retrieval queries and batches as retrieval
/// documents, which is how the index uses them.
///
/// # Example
///
/// ```rust,ignore
/// use lex_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("employer contribution").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider with the default model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(require_key(api_key.into())?),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a provider using the `GOOGLE_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the variable is unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::new(key_from_env()?)
    }

    /// Set the embedding model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the dimensionality reported by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Point the provider at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }

    fn failure(message: String) -> RagError {
        error!(provider = PROVIDER, error = %message, "embedding request failed");
        RagError::EmbeddingError { provider: PROVIDER.into(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let request =
            EmbedRequest { model: None, content: Content::text(text), task_type: "RETRIEVAL_QUERY" };
        let response: EmbedResponse = self
            .client
            .post(&self.client.url(&self.model, "embedContent"), &request)
            .await
            .map_err(Self::failure)?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let url = self.client.url(&self.model, "batchEmbedContents");
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| EmbedRequest {
                        model: Some(format!("models/{}", self.model)),
                        content: Content::text(text),
                        task_type: "RETRIEVAL_DOCUMENT",
                    })
                    .collect(),
            };
            let response: BatchEmbedResponse =
                self.client.post(&url, &request).await.map_err(Self::failure)?;
            if response.embeddings.len() != batch.len() {
                return Err(Self::failure(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`GenerationProvider`] backed by Gemini `generateContent`.
///
/// Construction fails fast when no API key is available, so a misconfigured
/// deployment is caught at startup rather than on the first question.
pub struct GeminiGenerationProvider {
    client: GeminiClient,
    model: String,
}

impl GeminiGenerationProvider {
    /// Create a provider for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self { client: GeminiClient::new(require_key(api_key.into())?), model: model.into() })
    }

    /// Create a provider for `model` using the `GOOGLE_API_KEY` environment
    /// variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the variable is unset or blank.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        Self::new(key_from_env()?, model)
    }

    /// Point the provider at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }

    /// The model this provider calls.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn failure(message: String) -> RagError {
        error!(provider = PROVIDER, error = %message, "generation request failed");
        RagError::GenerationError { provider: PROVIDER.into(), message }
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerationProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt.to_string() }],
            }],
        };
        let response: GenerateResponse = self
            .client
            .post(&self.client.url(&self.model, "generateContent"), &request)
            .await
            .map_err(Self::failure)?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(Self::failure(format!("empty response: {reason}")));
        }
        Ok(text)
    }
}
