use std::sync::Arc;

use ragvec_core::RagError;
use ragvec_embeddings::{
    DashScopeConfig, DashScopeEmbeddings, DashScopeModel, Embeddings, TextType, DEFAULT_BASE_URL,
};
use ragvec_models::{FakeBackend, ProviderResponse};
use serde_json::json;

fn client(backend: Arc<FakeBackend>) -> DashScopeEmbeddings {
    let config = DashScopeConfig::new("test-key", DashScopeModel::TextEmbeddingV1);
    DashScopeEmbeddings::new(config, backend)
}

#[test]
fn model_as_str() {
    assert_eq!(DashScopeModel::TextEmbeddingV1.as_str(), "text-embedding-v1");
    assert_eq!(DashScopeModel::TextEmbeddingV2.as_str(), "text-embedding-v2");
    assert_eq!(DashScopeModel::TextEmbeddingV3.as_str(), "text-embedding-v3");
    assert_eq!(
        DashScopeModel::Custom("my-model".into()).to_string(),
        "my-model"
    );
}

#[test]
fn config_defaults_and_builder() {
    let config = DashScopeConfig::new("key", DashScopeModel::TextEmbeddingV2);
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.text_type, TextType::Query);
    assert_eq!(config.model, "text-embedding-v2");

    let config = config
        .with_base_url("http://localhost:8080/embed")
        .with_text_type(TextType::Document);
    assert_eq!(config.base_url, "http://localhost:8080/embed");
    assert_eq!(config.text_type.as_str(), "document");
}

#[tokio::test]
async fn empty_input_sends_no_request() {
    let backend = Arc::new(FakeBackend::new());
    let embeddings = client(backend.clone());

    let err = embeddings.embed(&[]).await.unwrap_err();
    assert!(matches!(err, RagError::EmptyInput));
    assert_eq!(backend.request_count().await, 0);
}

#[tokio::test]
async fn request_carries_model_texts_and_text_type() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse::json(
        200,
        &json!({
            "output": {"embeddings": [
                {"text_index": 0, "embedding": [0.1, 0.2]},
                {"text_index": 1, "embedding": [0.3, 0.4]}
            ]},
            "usage": {"total_tokens": 7},
            "request_id": "req-1"
        }),
    ));
    let embeddings = client(backend.clone());
    embeddings.embed(&["pipe broke", "elevator down"]).await.unwrap();

    let sent = backend.requests().await;
    assert_eq!(sent.len(), 1);
    let req = &sent[0];
    assert_eq!(req.url, DEFAULT_BASE_URL);
    assert!(req
        .headers
        .iter()
        .any(|(k, v)| k == "Authorization" && v == "Bearer test-key"));
    assert_eq!(req.body["model"], "text-embedding-v1");
    assert_eq!(req.body["input"]["texts"], json!(["pipe broke", "elevator down"]));
    assert_eq!(req.body["parameters"]["text_type"], "query");
}

#[tokio::test]
async fn results_follow_input_order_and_expose_metadata() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse::json(
        200,
        &json!({
            "output": {"embeddings": [
                {"text_index": 2, "embedding": [3.0, 3.0]},
                {"text_index": 0, "embedding": [1.0, 1.0]},
                {"text_index": 1, "embedding": [2.0, 2.0]}
            ]},
            "usage": {"total_tokens": 12},
            "request_id": "abc-123"
        }),
    ));
    let embeddings = client(backend);
    let response = embeddings.embed(&["a", "b", "c"]).await.unwrap();

    assert_eq!(
        response.embeddings,
        vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]
    );
    assert_eq!(response.usage.total_tokens, 12);
    assert_eq!(response.request_id.as_deref(), Some("abc-123"));
}

#[tokio::test]
async fn structured_provider_error_is_parsed() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse::json(
        400,
        &json!({
            "code": "InvalidApiKey",
            "message": "Invalid API-key provided.",
            "request_id": "err-9"
        }),
    ));
    let embeddings = client(backend);
    let err = embeddings.embed(&["x"]).await.unwrap_err();

    match err {
        RagError::Provider {
            status,
            code,
            message,
            request_id,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("InvalidApiKey"));
            assert_eq!(message, "Invalid API-key provided.");
            assert_eq!(request_id.as_deref(), Some("err-9"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unstructured_provider_error_surfaces_status_and_body() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse::new(502, "<html>Bad Gateway</html>"));
    let embeddings = client(backend);
    let err = embeddings.embed(&["x"]).await.unwrap_err();

    let text = err.to_string();
    assert!(text.contains("502"), "{text}");
    assert!(text.contains("Bad Gateway"), "{text}");
}

#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse::json(200, &json!({"data": []})));
    let embeddings = client(backend);
    let err = embeddings.embed(&["x"]).await.unwrap_err();
    assert!(matches!(err, RagError::Decode(_)));
}

#[tokio::test]
async fn missing_index_is_decode_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse::json(
        200,
        &json!({"output": {"embeddings": [{"text_index": 0, "embedding": [1.0]}]}}),
    ));
    let embeddings = client(backend);
    let err = embeddings.embed(&["x", "y"]).await.unwrap_err();
    assert!(matches!(err, RagError::Decode(msg) if msg.contains("text_index 1")));
}

#[tokio::test]
async fn transport_failure_is_propagated() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_error(RagError::Transport("connection reset".to_string()));
    let embeddings = client(backend);
    let err = embeddings.embed(&["x"]).await.unwrap_err();
    assert!(matches!(err, RagError::Transport(_)));
}

#[tokio::test]
async fn embed_query_returns_single_vector() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse::json(
        200,
        &json!({
            "output": {"embeddings": [{"text_index": 0, "embedding": [0.5, -0.5, 0.25]}]},
            "usage": {"total_tokens": 3},
            "request_id": "q-1"
        }),
    ));
    let embeddings = client(backend);
    let vector = embeddings.embed_query("water pipe leaking").await.unwrap();
    assert_eq!(vector, vec![0.5, -0.5, 0.25]);
}

// Integration test requiring a real API key
#[tokio::test]
#[ignore]
async fn embed_integration() {
    let api_key = std::env::var("API_KEY").unwrap();
    let config = DashScopeConfig::new(api_key, DashScopeModel::TextEmbeddingV1);
    let embeddings = DashScopeEmbeddings::new(config, Arc::new(ragvec_models::HttpBackend::new()));
    let response = embeddings
        .embed(&["the water pipe is broken, please fix it"])
        .await
        .unwrap();
    assert_eq!(response.embeddings.len(), 1);
    assert!(!response.embeddings[0].is_empty());
    assert!(response.request_id.is_some());
}
