use std::sync::Arc;

use ragvec_core::{RagError, VectorStore};
use ragvec_embeddings::{DashScopeConfig, DashScopeEmbeddings, DashScopeModel};
use ragvec_models::{HttpBackend, ProviderBackend};
use ragvec_pgvector::{PgVectorConfig, PgVectorStore};
use ragvec_retrieval::RetrievalService;
use sqlx::postgres::PgPoolOptions;

use crate::config::RagConfig;

fn model_from_name(name: &str) -> DashScopeModel {
    match name {
        "text-embedding-v1" => DashScopeModel::TextEmbeddingV1,
        "text-embedding-v2" => DashScopeModel::TextEmbeddingV2,
        "text-embedding-v3" => DashScopeModel::TextEmbeddingV3,
        other => DashScopeModel::Custom(other.to_string()),
    }
}

/// Build a DashScope client over an HTTP backend.
///
/// Fails with [`RagError::Config`] when no API key is configured.
pub fn dashscope_embeddings(config: &RagConfig) -> Result<DashScopeEmbeddings, RagError> {
    if config.api_key.is_empty() {
        return Err(RagError::Config("API_KEY is not set".to_string()));
    }

    let backend = match config.embedding_timeout {
        Some(timeout) => HttpBackend::with_timeout(timeout)?,
        None => HttpBackend::new(),
    };
    let backend: Arc<dyn ProviderBackend> = Arc::new(backend);

    let mut ds = DashScopeConfig::new(config.api_key.clone(), model_from_name(&config.model));
    if let Some(url) = &config.embedding_base_url {
        ds = ds.with_base_url(url.clone());
    }
    Ok(DashScopeEmbeddings::new(ds, backend))
}

fn store_config(config: &RagConfig) -> Result<PgVectorConfig, RagError> {
    if config.table_name.trim().is_empty() {
        return Err(RagError::Config("table name must not be empty".to_string()));
    }
    if config.dimension == 0 {
        return Err(RagError::Config("vector dimension must be > 0".to_string()));
    }

    let mut pg = PgVectorConfig::new(config.table_name.clone(), config.dimension)
        .with_row_decode_policy(config.row_decode_policy);
    if let Some(timeout) = config.query_timeout {
        pg = pg.with_query_timeout(timeout);
    }
    Ok(pg)
}

/// Open a pool, build the store and make sure its table exists with the
/// configured dimension.
///
/// An empty table name or a zero dimension is a [`RagError::Config`] and no
/// connection is attempted.
pub async fn connect_store(config: &RagConfig) -> Result<PgVectorStore, RagError> {
    let pg = store_config(config)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.database_url())
        .await
        .map_err(|e| {
            RagError::Persistence(format!(
                "connect to {}:{}/{}: {e}",
                config.postgres.host, config.postgres.port, config.postgres.dbname
            ))
        })?;

    let store = PgVectorStore::new(pool, pg);
    store.ensure_schema().await?;
    tracing::info!(
        table = %config.table_name,
        dimension = config.dimension,
        "vector store ready"
    );
    Ok(store)
}

/// [`dashscope_embeddings`] + [`connect_store`], wired into a service.
pub async fn connect_service(config: &RagConfig) -> Result<RetrievalService, RagError> {
    let embeddings = dashscope_embeddings(config)?;
    let store = connect_store(config).await?;
    Ok(RetrievalService::new(
        Arc::new(embeddings),
        Arc::new(store) as Arc<dyn VectorStore>,
    ))
}
