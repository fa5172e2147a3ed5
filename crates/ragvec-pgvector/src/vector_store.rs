use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ragvec_core::{
    check_dimension, decode_vector, encode_vector, Metric, RagError, RankedResults,
    RowDecodePolicy, ScoredRecord, VectorRecord, VectorStore,
};
use sqlx::PgPool;

/// Configuration for a [`PgVectorStore`] table.
#[derive(Debug, Clone)]
pub struct PgVectorConfig {
    /// Name of the PostgreSQL table, optionally schema-qualified.
    pub table_name: String,
    /// Width of the `embedding` column (e.g. 1536 for DashScope
    /// `text-embedding-v1`).
    pub vector_dimensions: u32,
    /// What to do with result rows whose embedding cannot be decoded.
    pub row_decode_policy: RowDecodePolicy,
    /// Upper bound for each statement; `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
}

impl PgVectorConfig {
    /// Create a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `table_name` is empty or `vector_dimensions` is zero.
    pub fn new(table_name: impl Into<String>, vector_dimensions: u32) -> Self {
        let table_name = table_name.into();
        assert!(!table_name.is_empty(), "table_name must not be empty");
        assert!(vector_dimensions > 0, "vector_dimensions must be > 0");
        Self {
            table_name,
            vector_dimensions,
            row_decode_policy: RowDecodePolicy::Abort,
            query_timeout: None,
        }
    }

    pub fn with_row_decode_policy(mut self, policy: RowDecodePolicy) -> Self {
        self.row_decode_policy = policy;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

/// A [`VectorStore`] backed by PostgreSQL with the pgvector extension.
///
/// Records live in a single table:
/// - `id BIGSERIAL PRIMARY KEY`
/// - `embedding vector(<dimensions>) NOT NULL`
/// - `text TEXT`
/// - `mark TEXT`
///
/// Call [`ensure_schema`](VectorStore::ensure_schema) once after construction
/// to create the pgvector extension and the table.
pub struct PgVectorStore {
    pool: PgPool,
    config: PgVectorConfig,
}

impl PgVectorStore {
    /// Create a new store from an existing connection pool and config.
    pub fn new(pool: PgPool, config: PgVectorConfig) -> Self {
        Self { pool, config }
    }

    /// Return a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &PgVectorConfig {
        &self.config
    }

    /// Run one statement under the configured deadline, mapping driver errors
    /// with `on_error`.
    async fn timed<T>(
        &self,
        what: &str,
        on_error: fn(String) -> RagError,
        statement: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, RagError> {
        let result = match self.config.query_timeout {
            Some(limit) => tokio::time::timeout(limit, statement)
                .await
                .map_err(|_| RagError::Timeout(format!("{what} exceeded {limit:?}")))?,
            None => statement.await,
        };
        result.map_err(|e| on_error(format!("{what} failed: {e}")))
    }

    fn dims(&self) -> usize {
        self.config.vector_dimensions as usize
    }
}

type RecordRow = (i64, String, String, String);
type ScoredRow = (i64, String, String, String, f64);

#[async_trait]
impl VectorStore for PgVectorStore {
    fn dimension(&self) -> usize {
        self.dims()
    }

    async fn ensure_schema(&self) -> Result<(), RagError> {
        validate_table_name(&self.config.table_name)?;

        self.timed(
            "create pgvector extension",
            RagError::Schema,
            sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(&self.pool),
        )
        .await?;

        let create_table = create_table_sql(&self.config.table_name, self.config.vector_dimensions);
        self.timed(
            "create table",
            RagError::Schema,
            sqlx::query(&create_table).execute(&self.pool),
        )
        .await?;

        // CREATE TABLE IF NOT EXISTS leaves an older table untouched, so check
        // the columns it was actually declared with.
        let columns: Vec<(String, String)> = self
            .timed(
                "inspect columns",
                RagError::Schema,
                sqlx::query_as(
                    r#"SELECT a.attname::text, format_type(a.atttypid, a.atttypmod)
                       FROM pg_attribute a
                       WHERE a.attrelid = to_regclass($1)
                         AND a.attname IN ('embedding', 'text', 'mark')
                         AND a.attnum > 0
                         AND NOT a.attisdropped"#,
                )
                .bind(&self.config.table_name)
                .fetch_all(&self.pool),
            )
            .await?;

        check_columns(&self.config.table_name, &columns, self.config.vector_dimensions)?;
        tracing::info!(
            table = %self.config.table_name,
            dimension = self.config.vector_dimensions,
            "schema ready"
        );
        Ok(())
    }

    async fn insert(&self, text: &str, mark: &str, embedding: &[f32]) -> Result<i64, RagError> {
        check_dimension(self.dims(), embedding.len())?;
        validate_table_name(&self.config.table_name)?;

        let sql = format!(
            "INSERT INTO {table} (embedding, text, mark) VALUES ($1::text::vector, $2, $3) RETURNING id",
            table = self.config.table_name,
        );
        let (id,): (i64,) = self
            .timed(
                "insert",
                RagError::Persistence,
                sqlx::query_as(&sql)
                    .bind(encode_vector(embedding))
                    .bind(text)
                    .bind(mark)
                    .fetch_one(&self.pool),
            )
            .await?;

        tracing::debug!(table = %self.config.table_name, id, mark, "inserted record");
        Ok(id)
    }

    async fn query_by_distance(
        &self,
        query: &[f32],
        metric: Metric,
        limit: Option<usize>,
    ) -> Result<RankedResults, RagError> {
        check_dimension(self.dims(), query.len())?;
        validate_table_name(&self.config.table_name)?;

        let sql = similarity_sql(&self.config.table_name, metric);
        let rows: Vec<ScoredRow> = self
            .timed(
                "similarity search",
                RagError::Persistence,
                sqlx::query_as(&sql)
                    .bind(encode_vector(query))
                    .bind(limit.map(|k| i64::try_from(k).unwrap_or(i64::MAX)))
                    .fetch_all(&self.pool),
            )
            .await?;

        let results = collect_ranked(rows, self.dims(), self.config.row_decode_policy)?;
        tracing::debug!(
            table = %self.config.table_name,
            %metric,
            hits = results.len(),
            excluded = results.excluded,
            "similarity search"
        );
        Ok(results)
    }

    async fn get_by_id(&self, id: i64) -> Result<VectorRecord, RagError> {
        validate_table_name(&self.config.table_name)?;

        let sql = format!(
            "SELECT id, embedding::text, COALESCE(text, ''), COALESCE(mark, '') FROM {table} WHERE id = $1",
            table = self.config.table_name,
        );
        let row: Option<RecordRow> = self
            .timed(
                "get by id",
                RagError::Persistence,
                sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool),
            )
            .await?;

        let (id, literal, text, mark) = row.ok_or(RagError::NotFound(id))?;
        let embedding = decode_vector(&literal)
            .map_err(|e| RagError::Decode(format!("record {id}: {e}")))?;
        Ok(VectorRecord {
            id,
            embedding,
            text,
            mark,
        })
    }
}

fn create_table_sql(table: &str, dims: u32) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            embedding vector({dims}) NOT NULL,
            text TEXT,
            mark TEXT
        )"#
    )
}

/// Verify the `(name, type)` pairs read from the catalog: `embedding` must be
/// `vector(dims)`, and `text` and `mark` must exist.
fn check_columns(table: &str, columns: &[(String, String)], dims: u32) -> Result<(), RagError> {
    let type_of = |name: &str| {
        columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty.as_str())
    };

    let expected = format!("vector({dims})");
    match type_of("embedding") {
        None => {
            return Err(RagError::Schema(format!(
                "table {table} has no embedding column"
            )))
        }
        Some(actual) if actual != expected => {
            return Err(RagError::Schema(format!(
                "table {table} declares embedding as {actual}, expected {expected}"
            )))
        }
        Some(_) => {}
    }

    let missing: Vec<&str> = ["text", "mark"]
        .into_iter()
        .filter(|name| type_of(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(RagError::Schema(format!(
            "table {table} is missing column(s): {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Ranked select for `metric`. `$1` is the query vector literal, `$2` the
/// row limit (NULL for no limit).
///
/// NaN scores (cosine against a zero vector) are pushed behind every finite
/// score, and equal scores fall back to ascending id.
fn similarity_sql(table: &str, metric: Metric) -> String {
    let (score, direction) = match metric {
        Metric::L2Distance => ("embedding <-> $1::text::vector", "ASC"),
        Metric::CosineSimilarity => ("1 - (embedding <=> $1::text::vector)", "DESC"),
    };
    format!(
        r#"SELECT id, embedding::text, COALESCE(text, ''), COALESCE(mark, ''), score
           FROM (SELECT id, embedding, text, mark, {score} AS score FROM {table}) AS ranked
           ORDER BY score = 'NaN'::float8, score {direction}, id ASC
           LIMIT $2"#
    )
}

/// Decode result rows, applying the row decode policy to bad embeddings.
fn collect_ranked(
    rows: Vec<ScoredRow>,
    dims: usize,
    policy: RowDecodePolicy,
) -> Result<RankedResults, RagError> {
    let mut results = RankedResults::default();
    for (id, literal, text, mark, score) in rows {
        let decoded = decode_vector(&literal)
            .and_then(|embedding| check_dimension(dims, embedding.len()).map(|_| embedding));
        match decoded {
            Ok(embedding) => results.hits.push(ScoredRecord {
                record: VectorRecord {
                    id,
                    embedding,
                    text,
                    mark,
                },
                score,
            }),
            Err(e) => match policy {
                RowDecodePolicy::Abort => {
                    return Err(RagError::Decode(format!("record {id}: {e}")));
                }
                RowDecodePolicy::Exclude => {
                    tracing::warn!(id, error = %e, "excluding undecodable row");
                    results.excluded += 1;
                }
            },
        }
    }
    Ok(results)
}

/// Validate that a table name is safe to interpolate into SQL.
///
/// Allows alphanumeric ASCII characters, underscores, and dots (for
/// schema-qualified names like `public.vectors`).
fn validate_table_name(name: &str) -> Result<(), RagError> {
    if name.is_empty() {
        return Err(RagError::Config("table name must not be empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(RagError::Config(format!(
            "invalid table name '{name}': only alphanumeric, underscore, and dot characters are allowed",
        )));
    }
    Ok(())
}
