// Pokemon Vote - Web Server
// REST API with Axum over the SQLite vote store

use anyhow::{Context, Result};
use clap::Parser;
use pokemon_vote::api::{router, AppState};
use pokemon_vote::logging::init_tracing;
use pokemon_vote::StoreConfig;

/// Serve the vote API over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ServerArgs {
    #[command(flatten)]
    store: StoreConfig,

    /// Address to listen on
    #[arg(long, env = "POKEMON_VOTE_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// Turn on debug logging (RUST_LOG overrides)
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.verbose);

    let catalog = args.store.load_catalog()?;
    let store = args.store.open_store(&catalog)?;
    tracing::info!(db = ?args.store.db_path, pokemon = catalog.len(), "database opened");

    let app = router(AppState::new(catalog, store));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", args.bind))?;

    tracing::info!("🚀 Server running on http://{}", args.bind);
    tracing::info!("   API: http://{}/api/pokemon", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
