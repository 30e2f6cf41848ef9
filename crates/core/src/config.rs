use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PARENTKB_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PARENTKB_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            rag: RagConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Check everything that must hold before the process may serve requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        self.embedding.validate()?;
        self.rag.validate()?;
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  storage:     pdfs_dir={}, index_dir={}", self.storage.pdfs_dir.display(), self.storage.index_dir.display());
        tracing::info!("  llm:         provider={}, model={}", self.llm.provider, self.llm.model);
        tracing::info!("  embedding:   provider={}, model={}, dims={}", self.embedding.provider, self.embedding.model, self.embedding.dimensions);
        tracing::info!(
            "  rag:         collection={}, chunk_size={}, overlap={}, top_k={}",
            self.rag.collection, self.rag.chunk_size, self.rag.chunk_overlap, self.rag.top_k
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 8000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Knowledge-base PDFs.
    pub pdfs_dir: PathBuf,
    /// On-disk vector index directory.
    pub index_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let data_dir = PathBuf::from(profiled_env_or(p, "DATA_DIR", "data"));
        let pdfs_dir = profiled_env_opt(p, "PDFS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("pdfs"));
        let index_dir = profiled_env_opt(p, "INDEX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("vector_index"));
        Self {
            data_dir,
            pdfs_dir,
            index_dir,
        }
    }
}

// ── LLM (Groq / OpenAI / Ollama) ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "groq", "openai", "ollama"
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        let provider = profiled_env_or(p, "LLM_PROVIDER", "groq").to_lowercase();
        let api_key = match provider.as_str() {
            "groq" => profiled_env_opt(p, "GROQ_API_KEY"),
            "openai" => profiled_env_opt(p, "OPENAI_API_KEY"),
            _ => None,
        };
        Self {
            provider,
            api_key,
            model: profiled_env_or(p, "LLM_MODEL", "llama-3.3-70b-versatile"),
            base_url: profiled_env_opt(p, "LLM_BASE_URL"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.7),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 1500),
        }
    }

    /// Env key holding the credential for the selected provider, if it needs one.
    pub fn credential_key(&self) -> Option<&'static str> {
        match self.provider.as_str() {
            "groq" => Some("GROQ_API_KEY"),
            "openai" => Some("OPENAI_API_KEY"),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider.as_str() {
            "groq" | "openai" => {
                if self.api_key.is_none() {
                    return Err(ConfigError::MissingCredential {
                        provider: self.provider.clone(),
                        key: self.credential_key().unwrap_or("API_KEY"),
                    });
                }
            }
            "ollama" => {}
            other => {
                return Err(ConfigError::UnknownProvider {
                    kind: "LLM",
                    name: other.to_string(),
                })
            }
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid {
                key: "LLM_TEMPERATURE",
                reason: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }
        Ok(())
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" (any OpenAI-compatible /v1/embeddings server), "ollama"
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub batch_size: usize,
    /// Capacity of the query-embedding LRU cache.
    pub query_cache_size: usize,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        let provider = profiled_env_or(p, "EMBEDDING_PROVIDER", "openai").to_lowercase();
        let default_url = if provider == "ollama" {
            "http://localhost:11434"
        } else {
            "http://localhost:8080"
        };
        Self {
            base_url: profiled_env_or(p, "EMBEDDING_BASE_URL", default_url),
            provider,
            model: profiled_env_or(p, "EMBEDDING_MODEL", "intfloat/multilingual-e5-large"),
            api_key: profiled_env_opt(p, "EMBEDDING_API_KEY"),
            dimensions: profiled_env_parse(p, "EMBEDDING_DIMENSIONS", 1024),
            batch_size: profiled_env_parse(p, "EMBEDDING_BATCH_SIZE", 32),
            query_cache_size: profiled_env_parse(p, "EMBEDDING_QUERY_CACHE", 256),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.provider.as_str(), "openai" | "ollama") {
            return Err(ConfigError::UnknownProvider {
                kind: "embedding",
                name: self.provider.clone(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING_MODEL",
                reason: "must not be empty".into(),
            });
        }
        if self.dimensions == 0 {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING_DIMENSIONS",
                reason: "must be greater than zero".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING_BATCH_SIZE",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

// ── RAG ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub collection: String,
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl RagConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            collection: profiled_env_or(p, "RAG_COLLECTION", "parent_dashboard_kb"),
            chunk_size: profiled_env_parse(p, "CHUNK_SIZE", 1000),
            chunk_overlap: profiled_env_parse(p, "CHUNK_OVERLAP", 200),
            top_k: profiled_env_parse(p, "TOP_K_RETRIEVAL", 5),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "CHUNK_SIZE",
                reason: "must be greater than zero".into(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid {
                key: "CHUNK_OVERLAP",
                reason: format!(
                    "overlap {} must be smaller than chunk size {}",
                    self.chunk_overlap, self.chunk_size
                ),
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid {
                key: "TOP_K_RETRIEVAL",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: "parent_dashboard_kb".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
        }
    }
}
