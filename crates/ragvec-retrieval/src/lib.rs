//! Text-in, ranked-records-out retrieval on top of an [`Embeddings`] provider
//! and a [`VectorStore`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragvec_retrieval::{NewRecord, RetrievalService};
//! use ragvec_core::Metric;
//!
//! let service = RetrievalService::new(Arc::new(embeddings), Arc::new(store));
//! let report = service
//!     .ingest_batch(vec![NewRecord::new("the water pipe burst", "home-repair")])
//!     .await?;
//! let hits = service
//!     .find_similar_by_text("pipe leaking", Metric::CosineSimilarity, 5)
//!     .await?;
//! ```

mod ingest;
mod service;

pub use ingest::{IngestOutcome, IngestReport, NewRecord};
pub use service::{RetrievalConfig, RetrievalService, DEFAULT_MAX_TOP_K};

pub use ragvec_core::{Embeddings, Metric, RankedResults, ScoredRecord, VectorRecord, VectorStore};
