use std::collections::HashMap;

use async_trait::async_trait;
use ragvec_core::{EmbeddingResponse, EmbeddingUsage, Embeddings, RagError};

/// Deterministic embeddings for testing.
/// Generates vectors based on a simple hash of the input text, unless a fixed
/// vector was registered for that exact text.
pub struct FakeEmbeddings {
    dimensions: usize,
    fixed: HashMap<String, Vec<f32>>,
}

impl FakeEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fixed: HashMap::new(),
        }
    }

    /// Return `vector` verbatim whenever `text` is embedded.
    pub fn with_fixed(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.into(), vector);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.fixed
            .get(text)
            .cloned()
            .unwrap_or_else(|| text_to_vector(text, self.dimensions))
    }
}

impl Default for FakeEmbeddings {
    fn default() -> Self {
        Self::new(4)
    }
}

#[async_trait]
impl Embeddings for FakeEmbeddings {
    async fn embed(&self, texts: &[&str]) -> Result<EmbeddingResponse, RagError> {
        if texts.is_empty() {
            return Err(RagError::EmptyInput);
        }
        Ok(EmbeddingResponse {
            embeddings: texts.iter().map(|t| self.vector_for(t)).collect(),
            usage: EmbeddingUsage {
                total_tokens: texts.iter().map(|t| t.split_whitespace().count() as u64).sum(),
            },
            request_id: None,
        })
    }
}

/// Generate a deterministic vector from text. Similar texts produce similar vectors.
fn text_to_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dimensions];
    if dimensions == 0 {
        return vec;
    }
    for (i, byte) in text.bytes().enumerate() {
        vec[i % dimensions] += byte as f32;
    }
    // Normalize to unit vector
    let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in &mut vec {
            *x /= magnitude;
        }
    }
    vec
}
