//! Embedding provider abstraction and the HTTP implementation.
//!
//! Defines the [`Embedder`] trait and [`HttpEmbedder`], which calls an
//! OpenAI-style `/v1/embeddings` endpoint. Also provides the
//! [`cosine_similarity`] vector utility used by retrieval.
//!
//! The embedder performs exactly one attempt per request with a fixed
//! timeout. Rate limits and transient failures are surfaced as typed
//! [`EmbedError`]s; retry policy belongs to the caller.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::EmbedError;

/// Maps text to fixed-dimension vectors via an external call.
///
/// `dims` is fixed at construction; every vector returned by [`embed`]
/// (Embedder::embed) and [`embed_batch`](Embedder::embed_batch) has exactly
/// that many elements.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a single query text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed a batch of texts, returning one vector per input in order.
    /// Used by index builds to avoid one round trip per document.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Embedding provider calling an OpenAI-style embeddings endpoint.
///
/// Sends `{"model": ..., "input": [...]}` and reads `data[].embedding`
/// from the response. Large batches are split at the configured
/// `batch_size` before sending.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    api_key: Option<String>,
}

impl HttpEmbedder {
    /// Create a new embedder from configuration.
    ///
    /// Reads `OPENAI_API_KEY` from the environment once; the key is
    /// optional so that local endpoints (e.g. Ollama) work without one.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        })
    }

    /// Issue one embeddings request for a single batch.
    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbedError::Timeout
            } else {
                EmbedError::Malformed(format!("transport: {e}"))
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EmbedError::RateLimited);
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(EmbedError::Malformed(format!("HTTP {status}: {body_text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbedError::Malformed(e.to_string()))?;

        let vectors = parse_embeddings_response(&json)?;

        if vectors.len() != texts.len() {
            return Err(EmbedError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.dims {
                return Err(EmbedError::Malformed(format!(
                    "expected dimension {}, got {}",
                    self.dims,
                    vector.len()
                )));
            }
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let results = self.request_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Malformed("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.request_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Parse an OpenAI-style embeddings response: `data[].embedding` arrays,
/// returned in input order.
fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| EmbedError::Malformed("missing data array".to_string()))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| EmbedError::Malformed("missing embedding field".to_string()))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths; the
/// retrieval layer checks dimensions before scoring, so that case is a
/// guard rather than a contract.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
