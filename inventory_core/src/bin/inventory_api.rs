use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;

use inventory_core::api::{router, AppState};
use inventory_core::config::Settings;
use inventory_core::db::migrate;
use inventory_core::pipeline::PipelineContext;

#[derive(Parser)]
#[command(version, about = "Inventory reconciliation HTTP API")]
struct Cli {
    /// Settings file (TOML); defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = match cli.config.as_deref() {
        Some(path) => Settings::load_path(path)?,
        None => Settings::default(),
    };

    let database_url = shared_utils::env::get_env_var("DATABASE_URL")?;
    migrate::run_all(&database_url)?;

    let state = AppState {
        database_url,
        ctx: Arc::new(PipelineContext::new(settings)),
    };

    let listener = TcpListener::bind(&cli.bind).await?;
    tracing::info!(bind = %cli.bind, "inventory api listening");
    axum::serve(listener, router(state)).await?;

    Ok(())
}
