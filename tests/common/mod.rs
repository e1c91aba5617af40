//! Test doubles shared across the integration test binaries.
//!
//! The fakes are controllable failure injectors: a source whose responses
//! are scripted per attempt, an embedder with deterministic vectors, and a
//! chat client that replays a scripted transcript.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use raggedy::chat::{ChatClient, WireMessage};
use raggedy::embedding::Embedder;
use raggedy::error::{ChatError, CrawlError, EmbedError};
use raggedy::models::Document;
use raggedy::source::DocumentSource;

pub fn sample_docs() -> Vec<Document> {
    vec![
        Document::new("filesystem", "alpha.md", "alpha document body"),
        Document::new("filesystem", "beta.md", "beta document body"),
        Document::new("filesystem", "gamma.md", "gamma document body"),
    ]
}

/// Source whose responses are scripted per attempt; once the script is
/// exhausted it keeps returning the fallback. Counts crawl attempts and can
/// simulate a slow crawl so concurrent callers overlap one build.
pub struct ScriptedSource {
    script: Mutex<Vec<Result<Vec<Document>, CrawlError>>>,
    fallback: Vec<Document>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedSource {
    pub fn always(docs: Vec<Document>) -> Self {
        Self::new(Vec::new(), docs)
    }

    pub fn new(
        script: Vec<Result<Vec<Document>, CrawlError>>,
        fallback: Vec<Document>,
    ) -> Self {
        Self {
            script: Mutex::new(script),
            fallback,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for ScriptedSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn fetch_all(&self, _root: &str) -> Result<Vec<Document>, CrawlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Ok(self.fallback.clone())
        } else {
            script.remove(0)
        }
    }
}

/// Deterministic embedder: buckets the text's bytes into `dims` slots, so
/// equal texts map to equal vectors and different texts usually differ.
pub struct HashEmbedder {
    dims: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for (i, b) in text.bytes().enumerate() {
            v[(i + b as usize) % self.dims] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Chat client replaying a scripted transcript; records every payload it
/// was sent. Returns `"ok"` once the script is exhausted.
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<Vec<Result<String, ChatError>>>,
    payloads: Mutex<Vec<Vec<WireMessage>>>,
}

impl ScriptedChat {
    pub fn replying(replies: Vec<Result<String, ChatError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_payloads(&self) -> Vec<Vec<WireMessage>> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(
        &self,
        messages: &[WireMessage],
        _max_tokens: u32,
    ) -> Result<String, ChatError> {
        self.payloads.lock().unwrap().push(messages.to_vec());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok("ok".to_string())
        } else {
            replies.remove(0)
        }
    }
}
