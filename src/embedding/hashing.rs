/// Feature-hashing embedding provider
///
/// Maps each lowercase word to a signed bucket chosen by BLAKE3 and sums the
/// contributions. Texts sharing words land close together, which is enough
/// for offline operation and hermetic tests; it carries no semantics beyond
/// vocabulary overlap.
use super::{EmbeddingError, EmbeddingProvider};
use regex::Regex;
use std::sync::OnceLock;

pub struct HashingProvider {
    dimension: usize,
}

fn word_regex() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

impl HashingProvider {
    pub const MODEL_NAME: &'static str = "feature-hash";

    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InitializationError(
                "Dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str) {
        let hash = blake3::hash(feature.as_bytes());
        let bytes = hash.as_bytes();
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&bytes[..8]);
        let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign;
    }
}

impl EmbeddingProvider for HashingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let lowered = text.to_lowercase();
        let mut vector = vec![0.0; self.dimension];
        let mut seen_word = false;
        for word in word_regex().find_iter(&lowered) {
            self.accumulate(&mut vector, word.as_str());
            seen_word = true;
        }
        if !seen_word {
            self.accumulate(&mut vector, &lowered);
        }

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }
}
