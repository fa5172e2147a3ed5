use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod codec;

pub use codec::{decode_vector, encode_vector, LITERAL_PRECISION};

// ---------------------------------------------------------------------------
// RagError
// ---------------------------------------------------------------------------

/// Error type shared by every ragvec crate.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("empty input: at least one text is required")]
    EmptyInput,
    #[error("transport error: {0}")]
    Transport(String),
    #[error(
        "provider error (status {status}): {} - {message} (request_id: {})",
        .code.as_deref().unwrap_or("unknown"),
        .request_id.as_deref().unwrap_or("none")
    )]
    Provider {
        status: u16,
        code: Option<String>,
        message: String,
        request_id: Option<String>,
    },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("malformed vector literal: {reason}")]
    MalformedVectorLiteral {
        /// Zero-based component position, `None` when the delimiters are wrong.
        component: Option<usize>,
        reason: String,
    },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("schema error: {0}")]
    Schema(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("record not found: id {0}")]
    NotFound(i64),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("config error: {0}")]
    Config(String),
}

/// Fail with [`RagError::DimensionMismatch`] unless `actual == expected`.
pub fn check_dimension(expected: usize, actual: usize) -> Result<(), RagError> {
    if expected == actual {
        Ok(())
    } else {
        Err(RagError::DimensionMismatch { expected, actual })
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A persisted text together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Store-assigned identity, increasing and never reused.
    pub id: i64,
    pub embedding: Vec<f32>,
    /// The source text the embedding was computed from.
    pub text: String,
    /// Free-form label for grouping; not used for ranking.
    pub mark: String,
}

/// A record paired with the score a similarity query computed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub score: f64,
}

/// Ordered output of a similarity query, most similar first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResults {
    pub hits: Vec<ScoredRecord>,
    /// Rows skipped because they could not be decoded
    /// (only ever non-zero under [`RowDecodePolicy::Exclude`]).
    pub excluded: usize,
}

impl RankedResults {
    pub fn new(hits: Vec<ScoredRecord>) -> Self {
        Self { hits, excluded: 0 }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Keep only the first `k` hits.
    pub fn truncate(&mut self, k: usize) {
        self.hits.truncate(k);
    }

    /// Record ids in rank order.
    pub fn ids(&self) -> Vec<i64> {
        self.hits.iter().map(|hit| hit.record.id).collect()
    }
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// Ranking metric for similarity queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Euclidean distance; smaller is more similar.
    L2Distance,
    /// `1 - cosine_distance`; larger is more similar.
    CosineSimilarity,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::L2Distance => "l2_distance",
            Metric::CosineSimilarity => "cosine_similarity",
        }
    }

    /// Whether a larger score means a closer match.
    pub fn higher_is_better(&self) -> bool {
        matches!(self, Metric::CosineSimilarity)
    }

    /// Total order over `(score, id)` pairs, most similar first.
    ///
    /// Equal scores fall back to ascending id. NaN scores (cosine against a
    /// zero vector) sort after every finite score.
    pub fn rank(&self, a: (f64, i64), b: (f64, i64)) -> Ordering {
        let by_score = match (a.0.is_nan(), b.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
                if self.higher_is_better() {
                    ord.reverse()
                } else {
                    ord
                }
            }
        };
        by_score.then(a.1.cmp(&b.1))
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a store does with a result row whose embedding cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowDecodePolicy {
    /// Fail the whole query with [`RagError::Decode`].
    #[default]
    Abort,
    /// Drop the row and count it in [`RankedResults::excluded`].
    Exclude,
}

// ---------------------------------------------------------------------------
// Embeddings trait
// ---------------------------------------------------------------------------

/// Token accounting reported by the embedding provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    pub total_tokens: u64,
}

/// Result of one embedding call: a vector per input text, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub usage: EmbeddingUsage,
    pub request_id: Option<String>,
}

/// Trait for embedding text into vectors.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a non-empty batch of texts in a single provider call.
    ///
    /// Implementations return [`RagError::EmptyInput`] for an empty batch
    /// without issuing a request.
    async fn embed(&self, texts: &[&str]) -> Result<EmbeddingResponse, RagError>;

    /// Embed a single query text, discarding the call metadata.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut response = self.embed(&[text]).await?;
        if response.embeddings.len() != 1 {
            return Err(RagError::Decode(format!(
                "expected 1 embedding for query text, got {}",
                response.embeddings.len()
            )));
        }
        response
            .embeddings
            .pop()
            .ok_or_else(|| RagError::Decode("empty response".to_string()))
    }
}

// ---------------------------------------------------------------------------
// VectorStore trait
// ---------------------------------------------------------------------------

/// Persistence and similarity search for [`VectorRecord`]s of a fixed dimension.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Width of the embedding column every record must match.
    fn dimension(&self) -> usize;

    /// Create the backing table if needed; fail with [`RagError::Schema`] if it
    /// exists with a different dimension. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<(), RagError>;

    /// Persist one record and return its assigned id.
    async fn insert(&self, text: &str, mark: &str, embedding: &[f32]) -> Result<i64, RagError>;

    /// Score every stored record against `query`, most similar first,
    /// keeping at most `limit` hits (`None` keeps all).
    async fn query_by_distance(
        &self,
        query: &[f32],
        metric: Metric,
        limit: Option<usize>,
    ) -> Result<RankedResults, RagError>;

    /// Fetch a single record, or [`RagError::NotFound`].
    async fn get_by_id(&self, id: i64) -> Result<VectorRecord, RagError>;
}
