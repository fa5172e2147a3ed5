use std::sync::Arc;

use ragvec::config::RagConfig;
use ragvec::core::{Embeddings, Metric, RagError, RankedResults};
use ragvec::embeddings::FakeEmbeddings;
use ragvec::retrieval::{NewRecord, RetrievalService};
use tracing_subscriber::EnvFilter;

const HOME_DEVICE: &str = "home device repair";
const HARDWARE: &str = "hardware repair";
const SOFTWARE: &str = "software support";

fn sample_issues() -> Vec<NewRecord> {
    vec![
        NewRecord::new("The water pipe is broken, this is very urgent, please help", HOME_DEVICE),
        NewRecord::new(
            "The water pipe is leaking badly, please handle it soon and contact me for details",
            HOME_DEVICE,
        ),
        NewRecord::new("The elevator in my building is broken and needs repair", HARDWARE),
        NewRecord::new("The kitchen tap will not stop running, please fix it soon", HOME_DEVICE),
        NewRecord::new("The bathroom drain is blocked, please fix it right away", HOME_DEVICE),
        NewRecord::new("The fridge stopped cooling and the food is going bad", HOME_DEVICE),
        NewRecord::new("Feedback: the service order lookup page is broken", SOFTWARE),
        NewRecord::new("Option labels show garbled characters", SOFTWARE),
        NewRecord::new("Switching roles on the user home page has no effect", SOFTWARE),
        NewRecord::new("User id is empty", SOFTWARE),
        NewRecord::new("The user service lists duplicate options", SOFTWARE),
    ]
}

fn print_results(title: &str, results: &RankedResults) {
    println!("\n=== {title} ===");
    for hit in &results.hits {
        println!(
            "  id={:<4} score={:>9.6}  [{}] {}",
            hit.record.id, hit.score, hit.record.mark, hit.record.text
        );
    }
    if results.excluded > 0 {
        println!("  ({} rows excluded: undecodable embedding)", results.excluded);
    }
}

#[tokio::main]
async fn main() -> Result<(), RagError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RagConfig::from_env()?;

    // Without an API key, run against deterministic local embeddings.
    let embeddings: Arc<dyn Embeddings> = if config.api_key.is_empty() {
        tracing::warn!("API_KEY not set, using fake embeddings");
        Arc::new(FakeEmbeddings::new(config.dimension as usize))
    } else {
        Arc::new(ragvec::dashscope_embeddings(&config)?)
    };
    let store = ragvec::connect_store(&config).await?;
    let service = RetrievalService::new(embeddings, Arc::new(store));

    let report = service.ingest_batch(sample_issues()).await?;
    println!(
        "Stored {}/{} issues ({} tokens)",
        report.succeeded().len(),
        report.outcomes.len(),
        report.usage.total_tokens
    );
    for (index, err) in report.failed() {
        println!("  issue {index} not stored: {err}");
    }

    let question = "The water pipe is broken, this is very urgent, please help";
    for metric in [Metric::L2Distance, Metric::CosineSimilarity] {
        let results = service.find_similar_by_text(question, metric, 5).await?;
        print_results(&format!("{metric} for \"{question}\""), &results);
    }

    if let Some((_, id)) = report.succeeded().first().copied() {
        let results = service
            .find_similar_to_record(id, Metric::CosineSimilarity, 3)
            .await?;
        print_results(&format!("records like #{id}"), &results);
    }

    Ok(())
}
