use speaker_advisory_engine::{
    api::{start_server, ApiState},
    config::EngineConfig,
    debate::DebateOrchestrator,
    generation::PersonaConditionedGenerator,
    llm::{ChatModel, SolarChatModel, SolarEmbeddings},
    models::PersonaConfig,
    orchestrator::AdvisoryEngine,
    retrieval::{
        GraphSearchClient, HybridRetriever, Neo4jGraph, QdrantIndex, RelevanceReranker,
        VectorSearchClient,
    },
    speakers::InMemorySpeakerDirectory,
    transcript::{InMemoryTranscriptStore, PgTranscriptStore, TranscriptStore},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = EngineConfig::from_env();
    if config.upstage_api_key.is_empty() {
        eprintln!("⚠️  UPSTAGE_API_KEY not set in .env");
        eprintln!("📌 Model calls will fail until it is configured");
    }

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 Speaker Advisory Engine - API Server");
    info!("📍 Port: {}", api_port);

    // Model handles; judge and generator use different models on purpose.
    let chat_model = Arc::new(SolarChatModel::new(
        config.upstage_api_key.clone(),
        config.chat_model.clone(),
        config.call_timeout,
    ));
    let judge_model = Arc::new(
        SolarChatModel::new(
            config.upstage_api_key.clone(),
            config.judge_model.clone(),
            config.call_timeout,
        )
        .with_temperature(0.0),
    );
    let embeddings = Arc::new(SolarEmbeddings::new(
        config.upstage_api_key.clone(),
        config.embedding_model.clone(),
        config.call_timeout,
    ));

    // Retrieval backends
    let vector = VectorSearchClient::connect(
        embeddings,
        Arc::new(QdrantIndex::new(
            config.qdrant_url.clone(),
            config.qdrant_api_key.clone(),
            config.qdrant_collection.clone(),
            config.call_timeout,
        )),
        config.call_timeout,
    )
    .await;
    if vector.is_disabled() {
        warn!("Vector index unreachable; serving from graph search only");
    }

    let graph = GraphSearchClient::new(
        Arc::clone(&judge_model) as Arc<dyn ChatModel>,
        Arc::new(Neo4jGraph::new(
            config.neo4j_uri.clone(),
            config.neo4j_username.clone(),
            config.neo4j_password.clone(),
            config.call_timeout,
        )),
        config.call_timeout,
    );

    let reranker =
        RelevanceReranker::new(Arc::clone(&judge_model) as Arc<dyn ChatModel>, config.call_timeout);
    let generator = Arc::new(PersonaConditionedGenerator::new(
        chat_model,
        config.call_timeout,
    ));

    // Transcript store: Postgres when DATABASE_URL is set, in-memory otherwise.
    let transcript: Arc<dyn TranscriptStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?;
            info!("Transcript persistence: Postgres");
            Arc::new(PgTranscriptStore::new(pool))
        }
        Err(_) => {
            warn!("DATABASE_URL not set; transcripts are in-memory only");
            Arc::new(InMemoryTranscriptStore::new())
        }
    };

    let speakers = Arc::new(InMemorySpeakerDirectory::new());
    seed_speakers(&speakers).await;

    let engine = Arc::new(AdvisoryEngine::new(
        HybridRetriever::new(vector, graph, reranker),
        Arc::clone(&generator),
        speakers.clone(),
        config.top_k,
    ));
    let debate = Arc::new(DebateOrchestrator::new(
        generator,
        speakers,
        Arc::clone(&transcript),
    ));

    info!("✅ Engine initialized");
    info!("📡 Starting API server...");

    start_server(
        ApiState {
            engine,
            debate,
            transcript,
        },
        api_port,
    )
    .await?;

    Ok(())
}

async fn seed_speakers(speakers: &InMemorySpeakerDirectory) {
    speakers
        .insert(
            "1",
            PersonaConfig {
                name: "Park Taewung".to_string(),
                core_beliefs: vec![
                    "Technology must serve people".to_string(),
                    "Insight beats information".to_string(),
                ],
                speaking_style: [
                    ("tone".to_string(), "warm and thoughtful".to_string()),
                    (
                        "complexity".to_string(),
                        "makes hard ideas simple".to_string(),
                    ),
                ]
                .into(),
                key_phrases: vec!["in essence".to_string()],
                example_outputs: vec![],
            },
        )
        .await;
    speakers
        .insert(
            "3",
            PersonaConfig {
                name: "Han Sang-gi".to_string(),
                core_beliefs: vec!["Data sovereignty is a national asset".to_string()],
                speaking_style: [("tone".to_string(), "direct and analytical".to_string())].into(),
                key_phrases: vec![],
                example_outputs: vec![],
            },
        )
        .await;
}
