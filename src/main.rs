use anyhow::Result;
use clap::Parser;
use ragdesk::backend::{probe_endpoint, HttpBackend, ModelBackend};
use ragdesk::cli::{Cli, Commands};
use ragdesk::config::Config;
use ragdesk::loaders;
use ragdesk::rag::{KnowledgeEngine, QueryMode};
use ragdesk::server::{self, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Setup => handle_setup(&config).await?,
        Commands::Check => handle_check(&config).await?,
        Commands::Scan => handle_scan(&config)?,
        Commands::Process => handle_process(&config).await?,
        Commands::Query { question, mode } => handle_query(&config, &question, mode).await?,
        Commands::Serve { host, port, no_rag } => {
            handle_serve(&config, host, port, no_rag).await?
        }
    }

    Ok(())
}

async fn init_engine(config: &Config) -> Result<KnowledgeEngine> {
    let backend = Arc::new(HttpBackend::new(config));
    KnowledgeEngine::connect(config, backend).await
}

async fn handle_setup(config: &Config) -> Result<()> {
    config.ensure_directories()?;
    tracing::info!("Directories created/verified");

    println!("{} started", config.app.name);
    println!("Configuration:");
    println!("  Working dir:        {}", config.storage.working_dir.display());
    println!("  Documents:          {}", config.storage.docs_dir.display());
    println!("  Logs:               {}", config.storage.log_dir.display());
    println!("  LLM model:          {}", config.llm.model);
    println!("  LLM endpoint:       {}", config.llm_endpoint());
    println!("  Embedding model:    {}", config.embedding.model);
    println!("  Embedding endpoint: {}", config.embedding_endpoint());
    println!("  Chunk size:         {}", config.app.chunk_size);
    println!("  Embedding dim:      {}", config.embedding.dimensions);

    println!("\nNext steps:");
    println!("  1. Add documents to {}", config.storage.docs_dir.display());
    println!("  2. Start both model services (ports {} and {})", config.llm.port, config.embedding.port);
    println!("  3. Run `ragdesk process` to ingest documents");
    println!("  4. Run `ragdesk serve` for the dashboard");

    println!("\nPress Ctrl+C to exit...");
    tokio::signal::ctrl_c().await?;
    println!("\nGoodbye!");
    Ok(())
}

async fn handle_check(config: &Config) -> Result<()> {
    println!("Testing model service connections...");

    let client = reqwest::Client::new();
    let backend = HttpBackend::new(config);
    let mut ok = true;

    if probe_endpoint(&client, &config.llm_endpoint()).await {
        println!("LLM service reachable at {}", config.llm_endpoint());
        match backend.generate("Hello! Say hi back.", None, &[]).await {
            Ok(reply) => println!("LLM completion test: {}", reply.trim()),
            Err(e) => {
                println!("LLM completion test failed: {}", e);
                ok = false;
            }
        }
    } else {
        println!("LLM service unreachable at {}", config.llm_endpoint());
        ok = false;
    }

    if probe_endpoint(&client, &config.embedding_endpoint()).await {
        println!("Embedding service reachable at {}", config.embedding_endpoint());
        match backend.embed(&["Hello world".to_string()]).await {
            Ok(vectors) => println!(
                "Embedding test: got vector with {} dimensions",
                vectors.first().map(|v| v.len()).unwrap_or(0)
            ),
            Err(e) => {
                println!("Embedding test failed: {}", e);
                ok = false;
            }
        }
    } else {
        println!("Embedding service unreachable at {}", config.embedding_endpoint());
        ok = false;
    }

    if !ok {
        anyhow::bail!(
            "one or more model services failed; ensure both are running on ports {} and {}",
            config.llm.port,
            config.embedding.port
        );
    }

    println!("\nAll model services are working correctly");
    Ok(())
}

fn handle_scan(config: &Config) -> Result<()> {
    let entries = loaders::scan_directory(config, &config.storage.docs_dir)?;

    if entries.is_empty() {
        println!("No supported documents in {}", config.storage.docs_dir.display());
        return Ok(());
    }

    println!("Found {} documents:", entries.len());
    for entry in entries {
        println!("  {} ({} bytes)", entry.name, entry.size);
    }
    Ok(())
}

async fn handle_process(config: &Config) -> Result<()> {
    let client = reqwest::Client::new();
    let llm_online = probe_endpoint(&client, &config.llm_endpoint()).await;
    let embed_online = probe_endpoint(&client, &config.embedding_endpoint()).await;

    if !llm_online || !embed_online {
        anyhow::bail!(
            "model services unreachable (llm: {}, embedding: {}); ensure both are running on ports {} and {}",
            llm_online,
            embed_online,
            config.llm.port,
            config.embedding.port
        );
    }

    let engine = init_engine(config).await?;
    let report = engine
        .ingest_directory(&config.storage.docs_dir)
        .await?;

    println!("Ingestion complete:");
    println!("  Processed: {}", report.processed.len());
    println!("  Skipped:   {}", report.skipped.len());
    println!("  Failed:    {}", report.failed.len());
    for failure in &report.failed {
        println!("    {} - {}", failure.name, failure.error);
    }

    let question = "What is this document about?";
    println!("\nQuerying: {}", question);
    let answer = engine.answer(question, QueryMode::Hybrid).await;
    println!("Answer:\n{}", answer);

    Ok(())
}

async fn handle_query(config: &Config, question: &str, mode: QueryMode) -> Result<()> {
    let engine = init_engine(config).await?;
    let answer = engine.answer(question, mode).await;
    println!("{}", answer);
    Ok(())
}

async fn handle_serve(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
    no_rag: bool,
) -> Result<()> {
    let engine = if no_rag {
        None
    } else {
        match init_engine(config).await {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::warn!("RAG engine unavailable, serving dashboard without it: {}", e);
                None
            }
        }
    };

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let state = Arc::new(AppState {
        config: config.clone(),
        client: reqwest::Client::new(),
        engine,
    });

    println!("Starting {} dashboard on {}:{}", config.app.name, host, port);
    println!("Endpoints:");
    println!("  GET  /health    - Liveness check");
    println!("  GET  /status    - Service health and index counts");
    println!("  GET  /config    - Active configuration");
    println!("  GET  /documents - List documents in the source directory");
    println!("  POST /documents - Upload documents (multipart)");
    println!("  POST /ingest    - Ingest the source directory");
    println!("  POST /query     - Query the knowledge base");

    server::run_server(state, &host, port).await
}
