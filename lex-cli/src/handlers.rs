use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use lex_rag::document::{Metadata, SOURCE_KEY};
use lex_rag::gemini::{GeminiEmbeddingProvider, GeminiGenerationProvider};
use lex_rag::{
    EmbeddingIndex, EmbeddingProvider, HashingEmbeddingProvider, LanceVectorStore, RagConfig,
    RagOrchestrator, RagResponse, SentenceChunker, clean_text, seed_sample_documents,
};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::cli::{Cli, Command, EmbedderKind};

const SNIPPET_CHARS: usize = 240;

pub async fn run(cli: Cli) -> Result<()> {
    let config = RagConfig::builder()
        .chunk_size(cli.chunk_size)
        .chunk_overlap(cli.chunk_overlap)
        .top_k(cli.top_k)
        .db_path(cli.db_path.clone())
        .collection(cli.collection.clone())
        .generation_timeout_secs(cli.timeout_secs)
        .build()
        .context("invalid configuration")?;

    match &cli.command {
        Command::Ingest { path, source, metadata, raw } => {
            let index = open_index(&cli, &config).await?;
            let text = read_text(Some(path)).await?;
            let text = if *raw { text } else { clean_text(&text) };
            let source = match source {
                Some(source) => source.clone(),
                None => file_label(path),
            };
            let doc_id = index.add(&text, &source, Some(to_metadata(metadata))).await?;
            info!(doc_id = %doc_id, source = %source, "document ingested");
            println!("{doc_id}");
        }
        Command::Search { query, k, json } => {
            let index = open_index(&cli, &config).await?;
            let top_k = resolve_top_k(*k, &config);
            print!("{}", search_output(&index, query, top_k, *json).await?);
        }
        Command::Ask { query, k, json } => {
            let top_k = resolve_top_k(*k, &config);
            let orchestrator = open_orchestrator(&cli, config).await?;
            let response = orchestrator.get_response(query, top_k).await;
            if *json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Command::Summarize { path } => {
            let orchestrator = open_orchestrator(&cli, config).await?;
            let text = read_text(path.as_deref()).await?;
            println!("{}", orchestrator.summarize_text(&text).await);
        }
        Command::List { json } => {
            let index = open_index(&cli, &config).await?;
            let documents = index.list().await;
            if *json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else {
                for doc in &documents {
                    println!("{}  {} ({} chunks)", doc.doc_id, doc.source, doc.chunk_count);
                }
            }
        }
        Command::Count => {
            let index = open_index(&cli, &config).await?;
            println!("{}", index.count().await);
        }
        Command::Seed => {
            let index = open_index(&cli, &config).await?;
            let added = seed_sample_documents(&index).await?;
            println!("Added {added} sample documents.");
        }
    }
    Ok(())
}

fn embedder(cli: &Cli) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match cli.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbeddingProvider::default()),
        EmbedderKind::Gemini => Arc::new(
            GeminiEmbeddingProvider::new(cli.api_key.clone().unwrap_or_default())
                .context("the gemini embedder needs an API key (or use --embedder hashing)")?
                .with_model(cli.embedding_model.clone()),
        ),
    })
}

fn resolve_top_k(explicit: Option<usize>, config: &RagConfig) -> usize {
    explicit.unwrap_or(config.top_k)
}

async fn open_index(cli: &Cli, config: &RagConfig) -> Result<Arc<EmbeddingIndex>> {
    let embedder = embedder(cli)?;
    let store = LanceVectorStore::open(&config.db_path, embedder.dimensions())
        .await
        .with_context(|| format!("cannot open store at {}", config.db_path.display()))?;
    let chunker = SentenceChunker::new(config.chunk_size, config.chunk_overlap)?;
    let index = EmbeddingIndex::open(
        config.collection.clone(),
        embedder,
        Arc::new(store),
        Arc::new(chunker),
    )
    .await?;
    Ok(Arc::new(index))
}

async fn open_orchestrator(cli: &Cli, config: RagConfig) -> Result<RagOrchestrator> {
    let generator = GeminiGenerationProvider::new(cli.api_key.clone().unwrap_or_default(), &cli.model)
        .context("answering questions needs GOOGLE_API_KEY")?;
    let index = open_index(cli, &config).await?;
    Ok(RagOrchestrator::new(config, index, Arc::new(generator)))
}

/// Retrieval failures are logged by the index and reported as no matches.
async fn search_output(
    index: &EmbeddingIndex,
    query: &str,
    top_k: usize,
    json: bool,
) -> Result<String> {
    let results = index.search(query, top_k).await;
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&results)?));
    }
    if results.is_empty() {
        return Ok("No matching documents.\n".to_string());
    }
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        let source = result.source().unwrap_or("Unknown");
        out.push_str(&format!("[{}] {:.3}  {}\n", i + 1, result.score, source));
        out.push_str(&format!("    {}\n", snippet(&result.content)));
    }
    Ok(out)
}

async fn read_text(path: Option<&Path>) -> Result<String> {
    let text = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await.context("cannot read stdin")?;
            buf
        }
    };
    if text.trim().is_empty() {
        bail!("input text is empty");
    }
    Ok(text)
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn to_metadata(pairs: &[(String, String)]) -> Metadata {
    pairs.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()
}

fn snippet(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{cut}...")
}

fn print_response(response: &RagResponse) {
    println!("{}", response.answer);
    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for meta in &response.sources {
            let source = meta.get(SOURCE_KEY).and_then(Value::as_str).unwrap_or("Unknown");
            println!("  - {source}");
        }
    }
    if let Some(error) = &response.error {
        eprintln!("warning: {error}");
    }
    eprintln!(
        "({} context chunks, {:.2}s)",
        response.context_used, response.processing_time
    );
}
