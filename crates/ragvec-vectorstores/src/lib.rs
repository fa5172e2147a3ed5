mod in_memory;

pub use in_memory::InMemoryVectorStore;

// Re-export core traits/types for convenience.
pub use ragvec_core::{Metric, RankedResults, ScoredRecord, VectorRecord, VectorStore};
