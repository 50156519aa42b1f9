//! Configuration management for docseek
//!
//! One explicit [`Config`] value is loaded from TOML, overridden from the
//! environment, validated, and then passed by reference into every component
//! constructor.

use crate::error::{DocseekError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub indexing: IndexingConfig,
    pub embedding: EmbeddingConfig,
    pub vector_index: VectorIndexConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds `metadata.db` and the `vectors/` directory
    pub data_dir: PathBuf,
}

/// Eligibility and chunking rules for indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Lowercase extensions including the leading dot
    pub supported_extensions: Vec<String>,
    /// Directory names (or `a/b` component sequences) never descended into
    pub ignored_directories: Vec<String>,
    pub max_file_size_mb: u64,
    /// Window length in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive windows
    pub chunk_overlap: usize,
    /// Persist the indexes after this many newly indexed files in a batch
    pub persist_every: usize,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name ("all-MiniLM-L6-v2", "bge-small-en-v1.5", "bge-base-en-v1.5"
    /// or "feature-hash")
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// "flat" (exact) or "hnsw" (approximate)
    pub backend: String,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
}

/// Ranking knobs for the semantic and hybrid searches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub max_results: usize,
    /// Minimum embedding similarity for a semantic hit
    pub similarity_threshold: f32,
    /// Minimum fused score kept in hybrid results
    pub min_score: f32,
    /// Minimum filename-leg score
    pub filename_min_score: f32,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    /// Added to the semantic score when both legs find a path
    pub combined_boost: f32,
    pub preview_chars: usize,
}

/// Directories walked by full and incremental reindexing and by the
/// filename leg of the hybrid search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DocseekError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DocseekError::io(e, format!("Failed to read config file: {:?}", path))
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DocseekError::io(e, format!("Failed to create config directory: {:?}", parent))
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            DocseekError::io(e, format!("Failed to write config file: {:?}", path))
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: DOCSEEK_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("DOCSEEK_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "VECTOR_INDEX__BACKEND" => {
                self.vector_index.backend = value.to_string();
            }
            "INDEXING__CHUNK_SIZE" => {
                self.indexing.chunk_size = parse_env(path, value)?;
            }
            "INDEXING__CHUNK_OVERLAP" => {
                self.indexing.chunk_overlap = parse_env(path, value)?;
            }
            "SEARCH__MAX_RESULTS" => {
                self.search.max_results = parse_env(path, value)?;
            }
            "SEARCH__SIMILARITY_THRESHOLD" => {
                self.search.similarity_threshold = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DocseekError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("docseek").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| DocseekError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".docseek"))
    }

    /// Config rooted at `data_dir`, otherwise default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.storage.data_dir = data_dir.into();
        config
    }

    /// Maximum file size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.indexing.max_file_size_mb * 1024 * 1024
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| DocseekError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

const DEFAULT_EXTENSIONS: &[&str] = &[
    ".pdf", ".txt", ".md", ".doc", ".docx", ".xlsx", ".xls", ".csv", ".json", ".xml", ".py",
    ".js", ".ts", ".html", ".css", ".yaml", ".yml", ".toml", ".ini",
];

const DEFAULT_IGNORED: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "__pycache__",
    ".pytest_cache",
    "node_modules",
    ".venv",
    "venv",
    ".env",
    "Library/Caches",
    "Library/Logs",
    ".Trash",
    "System",
    "Applications",
    ".DS_Store",
];

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::default_data_dir().unwrap_or_else(|_| PathBuf::from(".docseek"));
        let scan_paths = dirs::home_dir()
            .map(|home| {
                vec![
                    home.join("Documents"),
                    home.join("Desktop"),
                    home.join("Downloads"),
                ]
            })
            .unwrap_or_default();

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig { data_dir },
            indexing: IndexingConfig {
                supported_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
                ignored_directories: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
                max_file_size_mb: 100,
                chunk_size: 1000,
                chunk_overlap: 200,
                persist_every: 100,
            },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                dimension: 384,
                batch_size: 32,
            },
            vector_index: VectorIndexConfig {
                backend: "flat".to_string(),
                hnsw_m: 16,
                hnsw_ef_construction: 200,
                hnsw_ef_search: 64,
            },
            search: SearchConfig {
                max_results: 20,
                similarity_threshold: 0.7,
                min_score: 0.3,
                filename_min_score: 0.6,
                semantic_weight: 0.5,
                keyword_weight: 0.3,
                combined_boost: 0.2,
                preview_chars: 200,
            },
            scan: ScanConfig { paths: scan_paths },
        }
    }
}
