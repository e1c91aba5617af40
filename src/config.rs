use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_provider")]
    pub provider: String,
    /// Filesystem root directory or remote tree-listing URL.
    pub root: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Name of the environment variable holding the remote source token.
    /// Read once at startup.
    #[serde(default)]
    pub token_env: Option<String>,
}

fn default_source_provider() -> String {
    "filesystem".to_string()
}
fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Full endpoint URL (e.g. `https://api.openai.com/v1/embeddings`).
    pub url: String,
    pub model: String,
    pub dims: usize,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embed_timeout_secs() -> u64 {
    30
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Full endpoint URL (e.g. `https://api.openai.com/v1/chat/completions`).
    pub url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Send the full prior conversation with each request. When false, only
    /// the current turn is sent alongside the retrieved context.
    #[serde(default = "default_include_history")]
    pub include_history: bool,
}

fn default_max_tokens() -> u32 {
    1024
}
fn default_chat_timeout_secs() -> u64 {
    60
}
fn default_system_prompt() -> String {
    "You are a helpful assistant. Answer using the provided context when it is relevant.".to_string()
}
fn default_include_history() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors to retrieve per query.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Upper bound on assembled context length, in characters.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_k() -> usize {
    4
}
fn default_max_context_chars() -> usize {
    6000
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.source.provider.as_str() {
        "filesystem" | "remote" => {}
        other => anyhow::bail!(
            "Unknown source provider: '{}'. Must be filesystem or remote.",
            other
        ),
    }

    if config.source.extensions.is_empty() {
        anyhow::bail!("source.extensions must list at least one suffix");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    if config.chat.max_tokens == 0 {
        anyhow::bail!("chat.max_tokens must be > 0");
    }

    if config.retrieval.k < 1 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if config.retrieval.max_context_chars == 0 {
        anyhow::bail!("retrieval.max_context_chars must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
[source]
root = "./docs"

[embedding]
url = "http://localhost:11434/v1/embeddings"
model = "nomic-embed-text"
dims = 768

[chat]
url = "http://localhost:11434/v1/chat/completions"
model = "llama3.2:latest"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.source.provider, "filesystem");
        assert_eq!(config.source.extensions, vec!["md".to_string()]);
        assert_eq!(config.embedding.timeout_secs, 30);
        assert_eq!(config.index.ttl_secs, 600);
        assert_eq!(config.retrieval.k, 4);
        assert!(config.chat.include_history);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let body = MINIMAL.replace("[source]", "[source]\nprovider = \"carrier-pigeon\"");
        let file = write_config(&body);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown source provider"));
    }

    #[test]
    fn zero_dims_is_rejected() {
        let body = MINIMAL.replace("dims = 768", "dims = 0");
        let file = write_config(&body);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn zero_k_is_rejected() {
        let body = format!("{MINIMAL}\n[retrieval]\nk = 0\n");
        let file = write_config(&body);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("retrieval.k"));
    }
}
