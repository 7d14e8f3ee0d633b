use speaker_advisory_engine::{
    debate::DebateOrchestrator,
    generation::PersonaConditionedGenerator,
    llm::{MockChatModel, MockEmbeddingModel},
    models::{AdvisoryRequest, PersonaConfig},
    orchestrator::AdvisoryEngine,
    retrieval::{
        GraphNode, GraphSearchClient, HybridRetriever, MockDocumentIndex, MockGraphStore,
        RelevanceReranker, ScoredDocument, VectorSearchClient,
    },
    speakers::InMemorySpeakerDirectory,
    transcript::InMemoryTranscriptStore,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Offline demo wired entirely against mocks; runs one advisory request and
/// one round-table session without any external service.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Speaker Advisory Engine starting (mock backends)");

    let call_timeout = Duration::from_secs(5);

    let speakers = Arc::new(InMemorySpeakerDirectory::new());
    speakers
        .insert(
            "1",
            PersonaConfig {
                name: "Park Taewung".to_string(),
                core_beliefs: vec!["Technology must serve people".to_string()],
                ..Default::default()
            },
        )
        .await;
    speakers
        .insert(
            "3",
            PersonaConfig {
                name: "Han Sang-gi".to_string(),
                core_beliefs: vec!["Data sovereignty is a national asset".to_string()],
                ..Default::default()
            },
        )
        .await;

    let documents = vec![ScoredDocument {
        content: "Sovereign AI means a nation controls its own models and data.".to_string(),
        metadata: HashMap::from([("speaker_name".to_string(), json!("Park Taewung"))]),
        score: 0.92,
    }];
    let vector = VectorSearchClient::connect(
        Arc::new(MockEmbeddingModel::fixed(vec![0.1, 0.2, 0.3])),
        Arc::new(MockDocumentIndex::with_documents(documents)),
        call_timeout,
    )
    .await;

    let graph = GraphSearchClient::new(
        Arc::new(MockChatModel::always("Sovereign AI")),
        Arc::new(MockGraphStore::with_nodes(vec![GraphNode {
            name: "Sovereign AI".to_string(),
            definition: "independent national AI capability".to_string(),
        }])),
        call_timeout,
    );

    let reranker = RelevanceReranker::new(Arc::new(MockChatModel::always("0, 1")), call_timeout);
    let generator = Arc::new(PersonaConditionedGenerator::new(
        Arc::new(MockChatModel::always(
            "In essence, sovereign AI is about who holds the keys to your future. \
             What would your organization do if those keys were held elsewhere?",
        )),
        call_timeout,
    ));

    let engine = AdvisoryEngine::new(
        HybridRetriever::new(vector, graph, reranker),
        Arc::clone(&generator),
        speakers.clone(),
        5,
    );

    let request = AdvisoryRequest {
        query: "What is sovereign AI and why does it matter?".to_string(),
        speaker_id: "1".to_string(),
        conversation_id: Uuid::new_v4(),
    };

    info!(query = %request.query, "Running advisory request");

    let outcome = engine.run(&request).await?;

    println!("\n=== ADVISORY RESULT ===");
    println!("Answer: {}", outcome.response_text);
    println!("\nSources:");
    for (i, candidate) in outcome.source_candidates.iter().enumerate() {
        println!(
            "  {}: [{:?}] ({:.4}) {}",
            i + 1,
            candidate.origin,
            candidate.score,
            candidate.content
        );
    }

    let transcript = Arc::new(InMemoryTranscriptStore::new());
    let debate = DebateOrchestrator::new(generator, speakers, transcript.clone());

    let conversation_id = Uuid::new_v4();
    let session = debate
        .run(conversation_id, "Should AI development be regulated?", "1", "3")
        .await?;

    println!("\n=== ROUND TABLE ===");
    println!("Topic: {}", session.topic);
    for message in transcript.messages(conversation_id).await {
        println!("\n[{}] {}", message.role, message.content);
    }

    Ok(())
}
