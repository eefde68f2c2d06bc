//! Skein service entry point
//!
//! Loads the built-in node library and serves the graph execution API.

use std::sync::Arc;

use clap::Parser;

mod api;

#[derive(Parser)]
#[command(name = "skein-service", about = "Graph execution service", version)]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Development mode: allow cross-origin requests from any frontend
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        log::error!("fatal: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(skein_nodes::registry()?);
    log::info!("loaded {} node types", registry.len());

    let mut app = api::router(registry);
    if cli.dev {
        log::info!("development mode enabled, CORS configured to allow all origins");
        app = app.layer(tower_http::cors::CorsLayer::permissive());
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port)).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
