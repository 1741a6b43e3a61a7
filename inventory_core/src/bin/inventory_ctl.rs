use anyhow::Result;
use clap::{Parser, Subcommand};

use inventory_core::config::Settings;
use inventory_core::db::{connection, migrate};
use inventory_core::pipeline::PipelineContext;
use inventory_core::{competitor, dispatcher};

#[derive(Parser)]
#[command(version, about = "Inventory reconciliation CLI")]
struct Cli {
    /// Settings file (TOML); defaults apply when omitted.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending schema migrations to DATABASE_URL.
    Migrate,
    /// Run the pipeline for one tenant.
    Scrape {
        #[arg(long)]
        tenant: String,
    },
    /// Run the pipeline for every eligible tenant under the wall-clock budget.
    ScrapeAll,
    /// Scan one competitor URL for a tenant and print the statistics.
    Competitor {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        url: String,
    },
}

fn load_settings(path: Option<&str>) -> Result<Settings> {
    match path {
        Some(p) => Settings::load_path(p),
        None => Ok(Settings::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let db_url = shared_utils::env::get_env_var("DATABASE_URL")?;

    match cli.cmd {
        Cmd::Migrate => {
            migrate::run_all(&db_url)?;
            println!("migrations applied");
        }
        Cmd::Scrape { tenant } => {
            let ctx = PipelineContext::new(load_settings(cli.config.as_deref())?);
            let mut conn = connection::connect_sqlite(&db_url)?;
            let response = dispatcher::run_single(&ctx, &mut conn, &tenant).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Cmd::ScrapeAll => {
            let ctx = PipelineContext::new(load_settings(cli.config.as_deref())?);
            let mut conn = connection::connect_sqlite(&db_url)?;
            let response = dispatcher::run_all(&ctx, &mut conn).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Cmd::Competitor { tenant, url } => {
            let ctx = PipelineContext::new(load_settings(cli.config.as_deref())?);
            let mut conn = connection::connect_sqlite(&db_url)?;
            let stats = competitor::scan(&ctx, &mut conn, &tenant, &url).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
