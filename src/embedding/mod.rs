/// Embedding & vector indexing
///
/// - EmbeddingProvider trait for abstraction
/// - FastEmbedProvider for local sentence embeddings (all-MiniLM-L6-v2, 384-dim)
/// - HashingProvider for model-free offline embeddings
/// - VectorIndex: append-only slots with flat or HNSW search
mod hashing;
mod provider;
mod vector_index;

pub use hashing::HashingProvider;
pub use provider::{create_provider, EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use vector_index::{IndexBackend, SearchResult, SlotRecord, VectorIndex, VectorIndexError};

/// Scale `vector` to unit L2 norm in place.
///
/// Inner product is used as cosine similarity everywhere, which only holds on
/// unit vectors.
pub fn normalize(vector: &mut [f32]) -> Result<(), EmbeddingError> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(EmbeddingError::ZeroVector);
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    Ok(())
}

/// Embed `texts` in sub-batches of `batch_size` and normalise every vector.
pub fn embed_normalized(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embeddings = provider.embed_batch(batch)?;
        if embeddings.len() != batch.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }
        for mut embedding in embeddings {
            if embedding.len() != provider.dimension() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: provider.dimension(),
                    actual: embedding.len(),
                });
            }
            normalize(&mut embedding)?;
            vectors.push(embedding);
        }
    }
    Ok(vectors)
}
