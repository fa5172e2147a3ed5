//! ragvec: embed text with a remote provider, keep the vectors in
//! PostgreSQL + pgvector, and fetch nearest neighbours by L2 distance or
//! cosine similarity.
//!
//! This crate re-exports the ragvec sub-crates and adds environment-driven
//! configuration ([`config::RagConfig`]) plus helpers that wire a ready
//! [`RetrievalService`](retrieval::RetrievalService) from it.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `dashscope`, `pgvector`, `retrieval` |
//! | `dashscope` | `ProviderBackend` transport + DashScope and fake embeddings |
//! | `pgvector` | PostgreSQL + pgvector `VectorStore` |
//! | `in-memory` | In-process `VectorStore` |
//! | `retrieval` | `RetrievalService` |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ragvec::config::RagConfig;
//! use ragvec::core::Metric;
//! use ragvec::retrieval::NewRecord;
//!
//! let config = RagConfig::from_env()?;
//! let service = ragvec::connect_service(&config).await?;
//! service.ingest_batch(vec![NewRecord::new("the water pipe burst", "home")]).await?;
//! let hits = service.find_similar_by_text("pipe leaking", Metric::CosineSimilarity, 5).await?;
//! ```

/// Core traits and types: Embeddings, VectorStore, VectorRecord, Metric,
/// RagError, and the vector literal codec. Always available.
pub use ragvec_core as core;

pub mod config;

/// ProviderBackend abstraction with HTTP and fake implementations.
#[cfg(feature = "dashscope")]
pub use ragvec_models as models;

/// DashScope and fake embedding clients.
#[cfg(feature = "dashscope")]
pub use ragvec_embeddings as embeddings;

/// PostgreSQL + pgvector vector store.
#[cfg(feature = "pgvector")]
pub use ragvec_pgvector as pgvector;

/// In-process vector store.
#[cfg(feature = "in-memory")]
pub use ragvec_vectorstores as vectorstores;

/// Batch ingestion and top-k similarity search.
#[cfg(feature = "retrieval")]
pub use ragvec_retrieval as retrieval;

#[cfg(all(feature = "dashscope", feature = "pgvector", feature = "retrieval"))]
mod bootstrap;

#[cfg(all(feature = "dashscope", feature = "pgvector", feature = "retrieval"))]
pub use bootstrap::{connect_service, connect_store, dashscope_embeddings};
