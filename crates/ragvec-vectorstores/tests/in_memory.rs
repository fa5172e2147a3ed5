use ragvec_core::RagError;
use ragvec_vectorstores::{InMemoryVectorStore, Metric, VectorStore};

async fn abc_store() -> (InMemoryVectorStore, i64, i64, i64) {
    let store = InMemoryVectorStore::new(2);
    let a = store.insert("a", "axis", &[1.0, 0.0]).await.unwrap();
    let b = store.insert("b", "axis", &[0.0, 1.0]).await.unwrap();
    let c = store.insert("c", "near-a", &[1.0, 0.001]).await.unwrap();
    (store, a, b, c)
}

#[tokio::test]
async fn l2_ranking_is_ascending_distance() {
    let (store, a, b, c) = abc_store().await;
    let results = store
        .query_by_distance(&[1.0, 0.0], Metric::L2Distance, None)
        .await
        .unwrap();

    assert_eq!(results.ids(), vec![a, c, b]);
    assert!(results.hits[0].score.abs() < 1e-12);
    assert!((results.hits[1].score - 0.001).abs() < 1e-6);
    assert!((results.hits[2].score - 2f64.sqrt()).abs() < 1e-6);
    assert_eq!(results.excluded, 0);
}

#[tokio::test]
async fn cosine_ranking_is_descending_similarity() {
    let (store, a, b, c) = abc_store().await;
    let results = store
        .query_by_distance(&[1.0, 0.0], Metric::CosineSimilarity, None)
        .await
        .unwrap();

    assert_eq!(results.ids(), vec![a, c, b]);
    assert!((results.hits[0].score - 1.0).abs() < 1e-12);
    assert!(results.hits[1].score < 1.0 && results.hits[1].score > 0.999);
    assert!(results.hits[2].score.abs() < 1e-12);
}

#[tokio::test]
async fn ties_break_on_ascending_id() {
    let store = InMemoryVectorStore::new(2);
    let first = store.insert("x", "m", &[0.0, 1.0]).await.unwrap();
    let second = store.insert("y", "m", &[0.0, 1.0]).await.unwrap();
    let third = store.insert("z", "m", &[0.0, 1.0]).await.unwrap();

    for metric in [Metric::L2Distance, Metric::CosineSimilarity] {
        let results = store.query_by_distance(&[1.0, 1.0], metric, None).await.unwrap();
        assert_eq!(results.ids(), vec![first, second, third], "{metric}");
    }
}

#[tokio::test]
async fn repeated_queries_are_identical() {
    let (store, ..) = abc_store().await;
    let q = [0.6, 0.8];
    let first = store
        .query_by_distance(&q, Metric::CosineSimilarity, None)
        .await
        .unwrap();
    let second = store
        .query_by_distance(&q, Metric::CosineSimilarity, None)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn limit_keeps_top_ranked() {
    let store = InMemoryVectorStore::new(1);
    for v in [5.0, 1.0, 4.0, 2.0, 3.0] {
        store.insert(&format!("v{v}"), "n", &[v]).await.unwrap();
    }
    let results = store
        .query_by_distance(&[0.0], Metric::L2Distance, Some(2))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.hits[0].record.text, "v1");
    assert_eq!(results.hits[1].record.text, "v2");
}

#[tokio::test]
async fn zero_vector_sorts_last_under_cosine() {
    let store = InMemoryVectorStore::new(2);
    let zero = store.insert("zero", "m", &[0.0, 0.0]).await.unwrap();
    let opposite = store.insert("opposite", "m", &[-1.0, 0.0]).await.unwrap();
    let results = store
        .query_by_distance(&[1.0, 0.0], Metric::CosineSimilarity, None)
        .await
        .unwrap();
    assert_eq!(results.ids(), vec![opposite, zero]);
    assert!(results.hits[1].score.is_nan());
}

#[tokio::test]
async fn insert_rejects_wrong_dimension() {
    let store = InMemoryVectorStore::new(3);
    for bad in [vec![1.0, 2.0], vec![1.0, 2.0, 3.0, 4.0]] {
        let err = store.insert("t", "m", &bad).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch { expected: 3, .. }
        ));
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn query_rejects_wrong_dimension() {
    let (store, ..) = abc_store().await;
    let err = store
        .query_by_distance(&[1.0, 0.0, 0.0], Metric::L2Distance, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));
}

#[tokio::test]
async fn insert_rejects_non_finite_components() {
    let store = InMemoryVectorStore::new(2);
    let err = store.insert("t", "m", &[f32::NAN, 0.0]).await.unwrap_err();
    assert!(matches!(err, RagError::Persistence(_)));
}

#[tokio::test]
async fn ids_increase_and_records_round_trip() {
    let store = InMemoryVectorStore::new(2);
    let first = store.insert("water pipe broke", "home", &[0.5, 0.5]).await.unwrap();
    let second = store.insert("user id is empty", "software", &[0.1, 0.9]).await.unwrap();
    assert!(second > first);

    let record = store.get_by_id(second).await.unwrap();
    assert_eq!(record.id, second);
    assert_eq!(record.text, "user id is empty");
    assert_eq!(record.mark, "software");
    assert_eq!(record.embedding, vec![0.1, 0.9]);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn get_missing_id_is_not_found() {
    let store = InMemoryVectorStore::new(2);
    let err = store.get_by_id(42).await.unwrap_err();
    assert!(matches!(err, RagError::NotFound(42)));
}

#[tokio::test]
async fn empty_store_returns_empty_results() {
    let store = InMemoryVectorStore::new(2);
    store.ensure_schema().await.unwrap();
    let results = store
        .query_by_distance(&[1.0, 0.0], Metric::L2Distance, None)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[test]
#[should_panic(expected = "dimension must be > 0")]
fn zero_dimension_panics() {
    InMemoryVectorStore::new(0);
}
