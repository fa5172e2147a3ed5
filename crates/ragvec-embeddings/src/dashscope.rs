use std::sync::Arc;

use async_trait::async_trait;
use ragvec_core::{EmbeddingResponse, EmbeddingUsage, Embeddings, RagError};
use ragvec_models::{ProviderBackend, ProviderRequest};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/embeddings/text-embedding/text-embedding";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashScopeModel {
    TextEmbeddingV1,
    TextEmbeddingV2,
    TextEmbeddingV3,
    Custom(String),
}

impl DashScopeModel {
    pub fn as_str(&self) -> &str {
        match self {
            DashScopeModel::TextEmbeddingV1 => "text-embedding-v1",
            DashScopeModel::TextEmbeddingV2 => "text-embedding-v2",
            DashScopeModel::TextEmbeddingV3 => "text-embedding-v3",
            DashScopeModel::Custom(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for DashScopeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `text_type` request parameter: DashScope embeds queries and documents
/// slightly differently for asymmetric retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextType {
    #[default]
    Query,
    Document,
}

impl TextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextType::Query => "query",
            TextType::Document => "document",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashScopeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub text_type: TextType,
}

impl DashScopeConfig {
    pub fn new(api_key: impl Into<String>, model: DashScopeModel) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            text_type: TextType::Query,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_text_type(mut self, text_type: TextType) -> Self {
        self.text_type = text_type;
        self
    }
}

/// Client for the DashScope text-embedding endpoint.
///
/// One call to [`Embeddings::embed`] is exactly one HTTP request; there is no
/// retry or rate limiting here.
pub struct DashScopeEmbeddings {
    config: DashScopeConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl DashScopeEmbeddings {
    pub fn new(config: DashScopeConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &DashScopeConfig {
        &self.config
    }

    fn build_request(&self, texts: &[&str]) -> ProviderRequest {
        ProviderRequest {
            url: self.config.base_url.clone(),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: json!({
                "model": self.config.model,
                "input": { "texts": texts },
                "parameters": { "text_type": self.config.text_type.as_str() },
            }),
        }
    }
}

#[derive(Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingPayload {
    output: OutputPayload,
    #[serde(default)]
    usage: Option<UsagePayload>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Deserialize)]
struct OutputPayload {
    embeddings: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    text_index: usize,
    embedding: Vec<f64>,
}

#[derive(Deserialize)]
struct UsagePayload {
    #[serde(default)]
    total_tokens: u64,
}

fn parse_error(status: u16, body: &str) -> RagError {
    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => RagError::Provider {
            status,
            code: Some(payload.code),
            message: payload.message,
            request_id: payload.request_id,
        },
        Err(_) => RagError::Provider {
            status,
            code: None,
            message: body.to_string(),
            request_id: None,
        },
    }
}

/// Parse a success body and put the vectors back into input order.
fn parse_response(body: &str, expected: usize) -> Result<EmbeddingResponse, RagError> {
    let payload: EmbeddingPayload = serde_json::from_str(body)
        .map_err(|e| RagError::Decode(format!("unexpected embedding response: {e}")))?;

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in payload.output.embeddings {
        let slot = slots.get_mut(item.text_index).ok_or_else(|| {
            RagError::Decode(format!(
                "text_index {} out of range for {expected} texts",
                item.text_index
            ))
        })?;
        if slot.is_some() {
            return Err(RagError::Decode(format!(
                "duplicate text_index {}",
                item.text_index
            )));
        }
        *slot = Some(item.embedding.into_iter().map(|v| v as f32).collect());
    }

    let embeddings = slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| RagError::Decode(format!("missing embedding for text_index {i}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(first) = embeddings.first() {
        if let Some(bad) = embeddings.iter().position(|e| e.len() != first.len()) {
            return Err(RagError::Decode(format!(
                "embedding {bad} has {} dimensions, expected {}",
                embeddings[bad].len(),
                first.len()
            )));
        }
    }

    Ok(EmbeddingResponse {
        embeddings,
        usage: EmbeddingUsage {
            total_tokens: payload.usage.map(|u| u.total_tokens).unwrap_or_default(),
        },
        request_id: payload.request_id,
    })
}

#[async_trait]
impl Embeddings for DashScopeEmbeddings {
    async fn embed(&self, texts: &[&str]) -> Result<EmbeddingResponse, RagError> {
        if texts.is_empty() {
            return Err(RagError::EmptyInput);
        }

        let request = self.build_request(texts);
        let response = self.backend.send(request).await?;

        if !response.is_success() {
            let err = parse_error(response.status, &response.body);
            tracing::warn!(status = response.status, error = %err, "embedding request rejected");
            return Err(err);
        }

        let parsed = parse_response(&response.body, texts.len())?;
        tracing::debug!(
            model = %self.config.model,
            texts = texts.len(),
            total_tokens = parsed.usage.total_tokens,
            request_id = parsed.request_id.as_deref().unwrap_or(""),
            "embedded batch"
        );
        Ok(parsed)
    }
}
