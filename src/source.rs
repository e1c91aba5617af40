//! Document sources: the crawling side of the pipeline.
//!
//! A [`DocumentSource`] enumerates text documents from a tree. Two
//! implementations are provided:
//!
//! - **[`FilesystemSource`]** — walks a local directory tree.
//! - **[`RemoteTreeSource`]** — walks a remote tree via a JSON listing API
//!   whose entries are tagged `file`/`dir` (GitHub contents style).
//!
//! Sources perform no internal retries. Failures map onto [`CrawlError`]
//! kinds and propagate to the caller, which owns retry policy.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::config::SourceConfig;
use crate::error::CrawlError;
use crate::models::Document;

/// Enumerates documents from a tree rooted at `root`.
///
/// Traversal order is not contractually significant; both implementations
/// sort their output by path so index builds are deterministic. An empty
/// tree yields an empty sequence, not an error.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Returns the source identifier used to tag documents (e.g.
    /// `"filesystem"`).
    fn name(&self) -> &str;

    /// Crawl the tree and return every matching text document.
    async fn fetch_all(&self, root: &str) -> Result<Vec<Document>, CrawlError>;
}

/// Create the appropriate [`DocumentSource`] based on configuration.
pub fn create_source(config: &SourceConfig) -> Result<Arc<dyn DocumentSource>> {
    match config.provider.as_str() {
        "filesystem" => Ok(Arc::new(FilesystemSource::new(config)?)),
        "remote" => Ok(Arc::new(RemoteTreeSource::new(config)?)),
        other => anyhow::bail!("Unknown source provider: {}", other),
    }
}

fn include_set(extensions: &[String]) -> Result<GlobSet> {
    let globs: Vec<String> = extensions
        .iter()
        .map(|ext| format!("**/*.{}", ext.trim_start_matches('.')))
        .collect();
    build_globset(&globs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

// ============ Filesystem Source ============

/// Walks a local directory tree, selecting files by suffix.
pub struct FilesystemSource {
    include: GlobSet,
    exclude: GlobSet,
}

impl FilesystemSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let include = include_set(&config.extensions)?;

        let mut excludes = vec![
            "**/.git/**".to_string(),
            "**/target/**".to_string(),
            "**/node_modules/**".to_string(),
        ];
        excludes.extend(config.exclude_globs.clone());
        let exclude = build_globset(&excludes)?;

        Ok(Self { include, exclude })
    }

    fn read_file(&self, path: &Path, relative: &str) -> Result<Option<String>, CrawlError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            // Non-UTF-8 files are not text documents; skip them.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::debug!(path = relative, "skipping non-text file");
                Ok(None)
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(CrawlError::Unauthorized(relative.to_string()))
            }
            Err(e) => Err(CrawlError::Transient(format!("{relative}: {e}"))),
        }
    }
}

#[async_trait]
impl DocumentSource for FilesystemSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn fetch_all(&self, root: &str) -> Result<Vec<Document>, CrawlError> {
        let root_path = Path::new(root);
        if !root_path.exists() {
            return Err(CrawlError::NotFound(root.to_string()));
        }

        let mut documents = Vec::new();

        for entry in WalkDir::new(root_path) {
            let entry = entry.map_err(|e| walkdir_error_to_crawl(root, e))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root_path).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if self.exclude.is_match(&rel_str) || !self.include.is_match(&rel_str) {
                continue;
            }

            if let Some(content) = self.read_file(path, &rel_str)? {
                documents.push(Document::new(self.name(), rel_str, content));
            }
        }

        // Sort for deterministic ordering
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(documents)
    }
}

fn walkdir_error_to_crawl(root: &str, err: walkdir::Error) -> CrawlError {
    let path = err
        .path()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string());

    match err.io_error().map(|io| io.kind()) {
        Some(std::io::ErrorKind::NotFound) => CrawlError::NotFound(path),
        Some(std::io::ErrorKind::PermissionDenied) => CrawlError::Unauthorized(path),
        _ => CrawlError::Transient(format!("{path}: {err}")),
    }
}

// ============ Remote Tree Source ============

/// One entry in a remote tree listing.
#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    /// Listing URL for directories.
    #[serde(default)]
    url: Option<String>,
    /// Raw content URL for files.
    #[serde(default)]
    download_url: Option<String>,
}

/// Walks a remote tree via a JSON listing API.
///
/// A GET on the root (and on each directory's `url`) returns an array of
/// entries tagged `"file"` or `"dir"`. File entries matching the suffix
/// filter are downloaded from their `download_url`.
pub struct RemoteTreeSource {
    client: reqwest::Client,
    include: GlobSet,
    token: Option<String>,
}

impl RemoteTreeSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("raggedy/0.1")
            .build()?;

        // Token env var is read once here, not per call.
        let token = config
            .token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());

        Ok(Self {
            client,
            include: include_set(&config.extensions)?,
            token,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, CrawlError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CrawlError::Transient(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(match status.as_u16() {
            404 => CrawlError::NotFound(url.to_string()),
            401 | 403 => CrawlError::Unauthorized(url.to_string()),
            429 => CrawlError::RateLimited,
            _ => CrawlError::Transient(format!("HTTP {status} for {url}")),
        })
    }

    async fn list(&self, url: &str) -> Result<Vec<TreeEntry>, CrawlError> {
        let response = self.get(url).await?;
        response
            .json()
            .await
            .map_err(|e| CrawlError::Transient(format!("unparseable listing at {url}: {e}")))
    }

    async fn download(&self, url: &str) -> Result<String, CrawlError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| CrawlError::Transient(format!("{url}: {e}")))
    }
}

#[async_trait]
impl DocumentSource for RemoteTreeSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn fetch_all(&self, root: &str) -> Result<Vec<Document>, CrawlError> {
        let mut pending = vec![root.to_string()];
        let mut documents = Vec::new();

        while let Some(url) = pending.pop() {
            for entry in self.list(&url).await? {
                match entry.kind.as_str() {
                    "dir" => {
                        if let Some(dir_url) = entry.url {
                            pending.push(dir_url);
                        }
                    }
                    "file" => {
                        if !self.include.is_match(&entry.path) {
                            continue;
                        }
                        let download_url = entry.download_url.ok_or_else(|| {
                            CrawlError::Transient(format!(
                                "listing entry {} has no download_url",
                                entry.path
                            ))
                        })?;
                        let content = self.download(&download_url).await?;
                        documents.push(Document::new(self.name(), entry.path, content));
                    }
                    // Symlinks, submodules and other exotic kinds are skipped.
                    _ => {}
                }
            }
        }

        documents.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs_config(root: &str) -> SourceConfig {
        SourceConfig {
            provider: "filesystem".to_string(),
            root: root.to_string(),
            extensions: vec!["md".to_string()],
            exclude_globs: Vec::new(),
            token_env: None,
        }
    }

    #[tokio::test]
    async fn filesystem_scan_selects_by_suffix_and_sorts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("guides")).unwrap();
        std::fs::write(root.join("zebra.md"), "zebra").unwrap();
        std::fs::write(root.join("guides/alpha.md"), "alpha").unwrap();
        std::fs::write(root.join("notes.txt"), "not markdown").unwrap();

        let source = FilesystemSource::new(&fs_config(".")).unwrap();
        let docs = source.fetch_all(root.to_str().unwrap()).await.unwrap();

        let paths: Vec<&str> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["guides/alpha.md", "zebra.md"]);
        assert_eq!(docs[0].source, "filesystem");
        assert_eq!(docs[0].content, "alpha");
    }

    #[tokio::test]
    async fn filesystem_default_excludes_apply() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("target/doc")).unwrap();
        std::fs::write(root.join("target/doc/generated.md"), "generated").unwrap();
        std::fs::write(root.join("README.md"), "readme").unwrap();

        let source = FilesystemSource::new(&fs_config(".")).unwrap();
        let docs = source.fetch_all(root.to_str().unwrap()).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path, "README.md");
    }

    #[tokio::test]
    async fn filesystem_missing_root_is_not_found() {
        let source = FilesystemSource::new(&fs_config(".")).unwrap();
        let err = source.fetch_all("/definitely/not/a/dir").await.unwrap_err();
        assert!(matches!(err, CrawlError::NotFound(_)));
    }

    #[tokio::test]
    async fn filesystem_empty_tree_is_not_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = FilesystemSource::new(&fs_config(".")).unwrap();
        let docs = source
            .fetch_all(tmp.path().to_str().unwrap())
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn extension_filter_tolerates_leading_dot() {
        let set = include_set(&[".md".to_string()]).unwrap();
        assert!(set.is_match("docs/guide.md"));
        assert!(!set.is_match("docs/guide.txt"));
    }
}
