use code_snippet_mcp::config::Config;
use code_snippet_mcp::embeddings::HttpEmbeddingClient;
use code_snippet_mcp::logging::init_logging;
use code_snippet_mcp::notes::NoteStore;
use code_snippet_mcp::quality::QualityRunner;
use code_snippet_mcp::tools::{CodeSnippetServer, ToolContext};
use code_snippet_mcp::vector_store::VectorStore;
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    // Guards flush the file appenders on drop; keep them for the whole run
    let _log_guards = init_logging(&config)?;

    tracing::info!("Starting MCP Server...");
    config.log_summary();

    let store = VectorStore::from_config(&config)?;
    let embedder = HttpEmbeddingClient::new(
        config.embedding_url.clone(),
        config.vector_size,
        config.http_timeout,
    )?;

    match store.ensure_collection_exists().await {
        Ok(true) => tracing::info!("Created collection {}", store.collection_name()),
        Ok(false) => tracing::info!("Using existing collection {}", store.collection_name()),
        Err(e) => tracing::error!(
            "Could not ensure collection {} exists, tools will report backend errors: {}",
            store.collection_name(),
            e
        ),
    }

    let ctx = ToolContext::new(
        store,
        Arc::new(embedder),
        NoteStore::new(),
        QualityRunner::default(),
    );

    let service = CodeSnippetServer::new(ctx, config.server_name.clone(), config.server_version.clone())
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })?;

    service.waiting().await?;
    tracing::info!("MCP Server stopped");
    Ok(())
}
