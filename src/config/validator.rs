use crate::config::Config;
use crate::error::{DocseekError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every failure
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_vector_index(config, &mut errors);
        Self::validate_search(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DocseekError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        let indexing = &config.indexing;

        if indexing.chunk_size == 0 {
            errors.push(ValidationError::new(
                "indexing.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if indexing.chunk_overlap >= indexing.chunk_size {
            errors.push(ValidationError::new(
                "indexing.chunk_overlap",
                format!(
                    "Chunk overlap ({}) must be smaller than chunk size ({})",
                    indexing.chunk_overlap, indexing.chunk_size
                ),
            ));
        }

        if indexing.max_file_size_mb == 0 {
            errors.push(ValidationError::new(
                "indexing.max_file_size_mb",
                "Maximum file size must be greater than 0",
            ));
        }

        if indexing.persist_every == 0 {
            errors.push(ValidationError::new(
                "indexing.persist_every",
                "Persist interval must be greater than 0",
            ));
        }

        for ext in &indexing.supported_extensions {
            if !ext.starts_with('.') || ext.to_lowercase() != *ext {
                errors.push(ValidationError::new(
                    "indexing.supported_extensions",
                    format!("Extension must be lowercase and start with '.': {}", ext),
                ));
            }
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Embedding dimension must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_vector_index(config: &Config, errors: &mut Vec<ValidationError>) {
        let backend = &config.vector_index.backend;
        if backend != "flat" && backend != "hnsw" {
            errors.push(ValidationError::new(
                "vector_index.backend",
                format!("Backend must be 'flat' or 'hnsw', got '{}'", backend),
            ));
        }

        if config.vector_index.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "vector_index.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.vector_index.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "vector_index.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        let search = &config.search;

        if search.max_results == 0 {
            errors.push(ValidationError::new(
                "search.max_results",
                "Max results must be greater than 0",
            ));
        }

        let unit_ranged = [
            ("search.similarity_threshold", search.similarity_threshold),
            ("search.min_score", search.min_score),
            ("search.filename_min_score", search.filename_min_score),
            ("search.semantic_weight", search.semantic_weight),
            ("search.keyword_weight", search.keyword_weight),
            ("search.combined_boost", search.combined_boost),
        ];
        for (path, value) in unit_ranged {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ValidationError::new(
                    path,
                    format!("Value must be between 0.0 and 1.0, got {}", value),
                ));
            }
        }
    }
}
