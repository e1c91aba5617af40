//! Error taxonomy for the retrieval and chat pipeline.
//!
//! Every fallible seam has its own enum so callers can match on the failure
//! kind instead of parsing strings. All variants are `Clone` because a failed
//! index build is fanned out to every caller waiting on that attempt.

use thiserror::Error;

/// Failure while crawling a document tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// The root path or a listed entry does not exist.
    #[error("source path not found: {0}")]
    NotFound(String),

    /// The source rejected our credentials for this path.
    #[error("source access denied: {0}")]
    Unauthorized(String),

    /// The source is throttling requests.
    #[error("source rate limited")]
    RateLimited,

    /// A failure that may succeed on retry. Crawling performs no internal
    /// retries; the caller owns retry policy.
    #[error("transient source failure: {0}")]
    Transient(String),
}

/// Failure while turning text into an embedding vector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbedError {
    #[error("embedding request timed out")]
    Timeout,

    #[error("embedding endpoint rate limited")]
    RateLimited,

    /// The endpoint returned an unusable response: a non-2xx status, an
    /// unparseable body, or vectors of the wrong dimension.
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

/// Failure while building an index snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexBuildError {
    /// The crawl produced no documents. The default build path publishes an
    /// empty index instead of this error; the variant exists for callers
    /// that treat an empty corpus as fatal.
    #[error("no documents found under the source root")]
    NoDocuments,

    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),
}

/// Failure while querying an index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("query dimension {query} does not match index dimension {index}")]
    DimensionMismatch { query: usize, index: usize },
}

/// Failure of a single chat completion attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("chat completion timed out")]
    Timeout,

    #[error("chat transport failure: {0}")]
    Transport(String),

    #[error("chat endpoint returned HTTP {0}")]
    Status(u16),

    #[error("malformed chat response: {0}")]
    MalformedResponse(String),
}
