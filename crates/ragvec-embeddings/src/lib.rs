mod dashscope;
mod fake;

pub use dashscope::{DashScopeConfig, DashScopeEmbeddings, DashScopeModel, TextType, DEFAULT_BASE_URL};
pub use fake::FakeEmbeddings;

// Re-export the Embeddings trait from core (forward-declared there).
pub use ragvec_core::{EmbeddingResponse, EmbeddingUsage, Embeddings};
