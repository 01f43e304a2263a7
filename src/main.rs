use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use textbook_rag::core::config::AppPaths;
use textbook_rag::core::logging;
use textbook_rag::server;
use textbook_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize_with_paths(paths).await?;

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("ingest") => run_ingest(&state, args.next().map(PathBuf::from)).await,
        Some("serve") | None => serve(state).await,
        Some(other) => anyhow::bail!("Unknown command '{}'; expected 'serve' or 'ingest [path]'", other),
    }
}

async fn run_ingest(state: &AppState, root: Option<PathBuf>) -> anyhow::Result<()> {
    let root = match root {
        Some(path) => state.paths.resolve(&path),
        None => state.corpus_root(),
    };

    let report = state
        .ingestion
        .ingest_with_report(&root)
        .await
        .with_context(|| format!("Ingestion from {} failed", root.display()))?;

    println!(
        "Successfully ingested {} chunks from {} documents into '{}'.",
        report.chunks,
        report.documents,
        state.index.collection()
    );
    Ok(())
}

async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let bind_addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
