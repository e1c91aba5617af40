//! Vector index snapshots and their build-once-many-readers cache.
//!
//! An [`Index`] is an immutable snapshot: once published it is never
//! mutated, only superseded wholesale by the next build. The
//! [`IndexCache`] owns the lifecycle — TTL expiry, manual invalidation,
//! and the build protocol:
//!
//! - At most one rebuild executes at a time per cache, no matter how many
//!   callers observe a stale index concurrently. The first caller starts
//!   the build and registers a shared in-flight future; late callers await
//!   that same future instead of starting their own.
//! - Every waiter of one attempt receives that attempt's result — the new
//!   `Arc<Index>` or its [`IndexBuildError`].
//! - A failed attempt leaves any previously published index intact and
//!   does not poison future `get()` calls.
//!
//! `built_at` is a [`tokio::time::Instant`] so TTL behavior is testable
//! under a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::embedding::Embedder;
use crate::error::IndexBuildError;
use crate::models::Document;
use crate::source::DocumentSource;

/// One embedded document inside an index snapshot.
#[derive(Debug, Clone)]
pub struct IndexedVector {
    pub vector: Vec<f32>,
    pub document: Arc<Document>,
}

/// An immutable, fully built index snapshot.
///
/// All vectors share one dimensionality. A snapshot with zero entries is a
/// valid published state (degraded operation after an empty crawl).
#[derive(Debug)]
pub struct Index {
    entries: Vec<IndexedVector>,
    dims: usize,
    built_at: Instant,
    document_count: usize,
}

impl Index {
    pub fn new(entries: Vec<IndexedVector>, dims: usize) -> Self {
        debug_assert!(entries.iter().all(|e| e.vector.len() == dims));
        let document_count = entries.len();
        Self {
            entries,
            dims,
            built_at: Instant::now(),
            document_count,
        }
    }

    pub fn entries(&self) -> &[IndexedVector] {
        &self.entries
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type BuildFuture = Shared<BoxFuture<'static, Result<Arc<Index>, IndexBuildError>>>;

struct CacheState {
    published: Option<Arc<Index>>,
    invalidated: bool,
    inflight: Option<BuildFuture>,
}

struct CacheInner {
    source: Arc<dyn DocumentSource>,
    embedder: Arc<dyn Embedder>,
    root: String,
    ttl: Duration,
    state: Mutex<CacheState>,
}

/// Cheap-to-clone handle to the shared index cache.
///
/// Safe under concurrent `get()`/`invalidate()` from independent sessions:
/// the lock guards only the publish/in-flight bookkeeping, never the build
/// itself, and published snapshots are shared as `Arc<Index>`.
#[derive(Clone)]
pub struct IndexCache {
    inner: Arc<CacheInner>,
}

impl IndexCache {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        embedder: Arc<dyn Embedder>,
        root: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                source,
                embedder,
                root: root.into(),
                ttl,
                state: Mutex::new(CacheState {
                    published: None,
                    invalidated: false,
                    inflight: None,
                }),
            }),
        }
    }

    /// Return the current index, rebuilding if it is absent, expired, or
    /// invalidated.
    ///
    /// Concurrent callers that observe a stale index during an in-flight
    /// build all await the same attempt and receive its result.
    pub async fn get(&self) -> Result<Arc<Index>, IndexBuildError> {
        let build = {
            let mut state = self.inner.state.lock().unwrap();

            if let Some(index) = &state.published {
                if !state.invalidated && index.built_at().elapsed() < self.inner.ttl {
                    tracing::debug!(documents = index.document_count(), "index cache hit");
                    return Ok(Arc::clone(index));
                }
            }

            match &state.inflight {
                Some(build) => build.clone(),
                None => {
                    let build = start_build(&self.inner);
                    state.inflight = Some(build.clone());
                    build
                }
            }
        };

        build.await
    }

    /// Force the next `get()` to rebuild regardless of TTL.
    ///
    /// The published snapshot is kept (not dropped) so that a failed forced
    /// rebuild still leaves the previous index available.
    pub fn invalidate(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.invalidated = true;
        tracing::debug!("index cache invalidated");
    }

    /// `invalidate()` followed by `get()`.
    pub async fn refresh(&self) -> Result<Arc<Index>, IndexBuildError> {
        self.invalidate();
        self.get().await
    }

    /// The currently published snapshot, if any, without triggering a
    /// rebuild. Used for status reporting.
    pub fn snapshot(&self) -> Option<Arc<Index>> {
        self.inner.state.lock().unwrap().published.clone()
    }
}

/// Create the shared build future for one attempt.
///
/// The future itself publishes on success and clears the in-flight slot in
/// both outcomes, so the cache never needs a separate completion path.
fn start_build(inner: &Arc<CacheInner>) -> BuildFuture {
    let inner = Arc::clone(inner);
    async move {
        let result = build_snapshot(&inner).await;

        let mut state = inner.state.lock().unwrap();
        state.inflight = None;
        match result {
            Ok(index) => {
                state.published = Some(Arc::clone(&index));
                state.invalidated = false;
                Ok(index)
            }
            // Previous published index stays intact; the next get() starts
            // a fresh attempt.
            Err(e) => Err(e),
        }
    }
    .boxed()
    .shared()
}

async fn build_snapshot(inner: &CacheInner) -> Result<Arc<Index>, IndexBuildError> {
    let started = Instant::now();
    let dims = inner.embedder.dims();

    let documents = inner.source.fetch_all(&inner.root).await?;

    if documents.is_empty() {
        tracing::warn!(
            root = inner.root.as_str(),
            "crawl returned no documents; publishing an empty index"
        );
        return Ok(Arc::new(Index::new(Vec::new(), dims)));
    }

    let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
    let vectors = inner.embedder.embed_batch(&texts).await?;

    let entries = documents
        .into_iter()
        .zip(vectors)
        .map(|(document, vector)| IndexedVector {
            vector,
            document: Arc::new(document),
        })
        .collect();

    let index = Arc::new(Index::new(entries, dims));
    tracing::info!(
        documents = index.document_count(),
        dims,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "published new index"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_is_valid() {
        let index = Index::new(Vec::new(), 384);
        assert!(index.is_empty());
        assert_eq!(index.document_count(), 0);
        assert_eq!(index.dims(), 384);
    }

    #[test]
    fn index_counts_documents() {
        let entries = vec![
            IndexedVector {
                vector: vec![1.0, 0.0],
                document: Arc::new(Document::new("filesystem", "a.md", "a")),
            },
            IndexedVector {
                vector: vec![0.0, 1.0],
                document: Arc::new(Document::new("filesystem", "b.md", "b")),
            },
        ];
        let index = Index::new(entries, 2);
        assert_eq!(index.document_count(), 2);
        assert_eq!(index.entries().len(), 2);
    }
}
