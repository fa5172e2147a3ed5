use std::collections::BTreeMap;

use async_trait::async_trait;
use ragvec_core::{
    check_dimension, Metric, RagError, RankedResults, ScoredRecord, VectorRecord, VectorStore,
};
use tokio::sync::RwLock;

struct Table {
    next_id: i64,
    rows: BTreeMap<i64, VectorRecord>,
}

/// In-memory vector store with the same ranking rules as the pgvector store.
///
/// Ids start at 1 and are never reused. Scores are computed in `f64`.
pub struct InMemoryVectorStore {
    dimension: usize,
    table: RwLock<Table>,
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of `dimension` components.
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is zero.
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be > 0");
        Self {
            dimension,
            table: RwLock::new(Table {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

fn check_finite(vector: &[f32]) -> Result<(), RagError> {
    match vector.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(RagError::Persistence(format!(
            "component {i} is not a finite number"
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_schema(&self) -> Result<(), RagError> {
        Ok(())
    }

    async fn insert(&self, text: &str, mark: &str, embedding: &[f32]) -> Result<i64, RagError> {
        check_dimension(self.dimension, embedding.len())?;
        check_finite(embedding)?;

        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id += 1;
        table.rows.insert(
            id,
            VectorRecord {
                id,
                embedding: embedding.to_vec(),
                text: text.to_string(),
                mark: mark.to_string(),
            },
        );
        tracing::debug!(id, mark, "inserted record");
        Ok(id)
    }

    async fn query_by_distance(
        &self,
        query: &[f32],
        metric: Metric,
        limit: Option<usize>,
    ) -> Result<RankedResults, RagError> {
        check_dimension(self.dimension, query.len())?;
        check_finite(query)?;

        let table = self.table.read().await;
        let mut scored: Vec<ScoredRecord> = table
            .rows
            .values()
            .map(|record| ScoredRecord {
                score: score(metric, query, &record.embedding),
                record: record.clone(),
            })
            .collect();

        scored.sort_by(|a, b| metric.rank((a.score, a.record.id), (b.score, b.record.id)));
        if let Some(k) = limit {
            scored.truncate(k);
        }

        Ok(RankedResults::new(scored))
    }

    async fn get_by_id(&self, id: i64) -> Result<VectorRecord, RagError> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(RagError::NotFound(id))
    }
}

fn score(metric: Metric, a: &[f32], b: &[f32]) -> f64 {
    match metric {
        Metric::L2Distance => l2_distance(a, b),
        Metric::CosineSimilarity => cosine_similarity(a, b),
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity; NaN when either vector has zero magnitude, matching
/// pgvector's `<=>` operator.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (dot / denom).clamp(-1.0, 1.0)
}
