use ragvec_core::{EmbeddingUsage, RagError};
use serde::{Deserialize, Serialize};

/// A text to embed and store, with its caller-assigned mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub text: String,
    pub mark: String,
}

impl NewRecord {
    pub fn new(text: impl Into<String>, mark: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mark: mark.into(),
        }
    }
}

/// Store outcome for one position of an ingested batch.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Position of the record in the submitted batch.
    pub index: usize,
    /// Assigned id, or the reason the insert failed.
    pub result: Result<i64, RagError>,
}

/// Per-item result of [`RetrievalService::ingest_batch`](crate::RetrievalService::ingest_batch),
/// plus the metadata of the single embedding call behind it.
#[derive(Debug)]
pub struct IngestReport {
    /// One entry per submitted record, in batch order.
    pub outcomes: Vec<IngestOutcome>,
    pub usage: EmbeddingUsage,
    pub request_id: Option<String>,
}

impl IngestReport {
    /// `(index, id)` of every record that was stored.
    pub fn succeeded(&self) -> Vec<(usize, i64)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|id| (o.index, *id)))
            .collect()
    }

    /// `(index, error)` of every record that was not stored.
    pub fn failed(&self) -> Vec<(usize, &RagError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.index, e)))
            .collect()
    }

    /// True when every record in the batch was stored.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Assigned ids in batch order, `None` where the insert failed.
    pub fn ids(&self) -> Vec<Option<i64>> {
        self.outcomes
            .iter()
            .map(|o| o.result.as_ref().ok().copied())
            .collect()
    }
}
