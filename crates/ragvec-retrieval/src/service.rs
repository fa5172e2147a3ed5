use std::sync::Arc;

use ragvec_core::{
    check_dimension, Embeddings, Metric, RagError, RankedResults, VectorRecord, VectorStore,
};

use crate::ingest::{IngestOutcome, IngestReport, NewRecord};

/// Upper bound applied to `top_k` unless configured otherwise.
pub const DEFAULT_MAX_TOP_K: usize = 1000;

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Requests for more hits than this are clamped.
    pub max_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

impl RetrievalConfig {
    pub fn with_max_top_k(mut self, max_top_k: usize) -> Self {
        self.max_top_k = max_top_k;
        self
    }
}

/// Embeds text with an [`Embeddings`] provider and stores/searches it in a
/// [`VectorStore`].
///
/// The embedding call and the inserts that follow are separate steps: a batch
/// whose embedding succeeded can still be partially stored, and the returned
/// [`IngestReport`] says which items made it.
pub struct RetrievalService {
    embeddings: Arc<dyn Embeddings>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl RetrievalService {
    pub fn new(embeddings: Arc<dyn Embeddings>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embeddings,
            store,
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embed all texts in one provider call, then insert each record in order.
    ///
    /// Fails as a whole only when nothing could be stored: an empty batch
    /// ([`RagError::EmptyInput`]) or a failed embedding call. Insert failures
    /// are reported per index in the returned report.
    pub async fn ingest_batch(&self, records: Vec<NewRecord>) -> Result<IngestReport, RagError> {
        if records.is_empty() {
            return Err(RagError::EmptyInput);
        }

        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let response = self.embeddings.embed(&texts).await?;
        if response.embeddings.len() != records.len() {
            return Err(RagError::Decode(format!(
                "provider returned {} embeddings for {} texts",
                response.embeddings.len(),
                records.len()
            )));
        }

        let mut outcomes = Vec::with_capacity(records.len());
        for (index, (record, embedding)) in records.iter().zip(&response.embeddings).enumerate() {
            let result = self.store.insert(&record.text, &record.mark, embedding).await;
            if let Err(e) = &result {
                tracing::warn!(index, mark = %record.mark, error = %e, "insert failed");
            }
            outcomes.push(IngestOutcome { index, result });
        }

        let report = IngestReport {
            outcomes,
            usage: response.usage,
            request_id: response.request_id,
        };
        tracing::info!(
            records = records.len(),
            stored = report.succeeded().len(),
            failed = report.failed().len(),
            total_tokens = report.usage.total_tokens,
            request_id = report.request_id.as_deref().unwrap_or(""),
            "ingested batch"
        );
        Ok(report)
    }

    /// Embed `text` and return the `top_k` most similar records.
    ///
    /// `top_k` above [`RetrievalConfig::max_top_k`] is clamped to that maximum,
    /// so fewer hits than requested can come back even when the store holds
    /// more records. `top_k == 0` returns an empty result without embedding.
    pub async fn find_similar_by_text(
        &self,
        text: &str,
        metric: Metric,
        top_k: usize,
    ) -> Result<RankedResults, RagError> {
        if top_k == 0 {
            return Ok(RankedResults::default());
        }
        let vector = self.embeddings.embed_query(text).await?;
        self.find_similar_by_vector(&vector, metric, top_k).await
    }

    /// Return the `top_k` records most similar to `vector`.
    ///
    /// The vector length is checked against the store first. `top_k` above
    /// [`RetrievalConfig::max_top_k`] is clamped to that maximum (logged at
    /// `warn`), so the result may hold fewer hits than requested.
    pub async fn find_similar_by_vector(
        &self,
        vector: &[f32],
        metric: Metric,
        top_k: usize,
    ) -> Result<RankedResults, RagError> {
        check_dimension(self.store.dimension(), vector.len())?;
        if top_k == 0 {
            return Ok(RankedResults::default());
        }

        let k = self.effective_top_k(top_k);
        let mut results = self.store.query_by_distance(vector, metric, Some(k)).await?;
        results.truncate(k);
        Ok(results)
    }

    /// Run [`find_similar_by_vector`](Self::find_similar_by_vector) for each
    /// vector, stopping at the first error.
    pub async fn find_similar_by_vectors(
        &self,
        vectors: &[Vec<f32>],
        metric: Metric,
        top_k: usize,
    ) -> Result<Vec<RankedResults>, RagError> {
        let mut all = Vec::with_capacity(vectors.len());
        for vector in vectors {
            all.push(self.find_similar_by_vector(vector, metric, top_k).await?);
        }
        Ok(all)
    }

    /// Records most similar to the stored record `id`. The record itself is
    /// part of the result, normally ranked first.
    pub async fn find_similar_to_record(
        &self,
        id: i64,
        metric: Metric,
        top_k: usize,
    ) -> Result<RankedResults, RagError> {
        let record = self.store.get_by_id(id).await?;
        self.find_similar_by_vector(&record.embedding, metric, top_k)
            .await
    }

    pub async fn get_record(&self, id: i64) -> Result<VectorRecord, RagError> {
        self.store.get_by_id(id).await
    }

    fn effective_top_k(&self, top_k: usize) -> usize {
        if top_k > self.config.max_top_k {
            tracing::warn!(
                requested = top_k,
                max = self.config.max_top_k,
                "top_k clamped"
            );
            self.config.max_top_k
        } else {
            top_k
        }
    }
}
