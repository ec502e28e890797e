mod runtime;
mod scheduler;
mod seed;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use engage_core::EngagementType;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "engage")]
#[command(about = "Multi-tenant engagement poller and reward dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one poll cycle over all active tenants and print the report
    Run {
        /// Limit the cycle to one tenant slug
        #[arg(long)]
        tenant: Option<String>,
        /// Fetch and filter only; nothing is dispatched or written
        #[arg(long)]
        dry_run: bool,
    },
    /// Poll a single engagement type for one tenant
    Poll {
        #[arg(long)]
        tenant: String,
        #[arg(long = "type")]
        kind: EngagementType,
        #[arg(long)]
        dry_run: bool,
    },
    /// Clear a cursor so the next poll of that type is a first run
    ResetCursor {
        #[arg(long)]
        tenant: String,
        #[arg(long = "type")]
        kind: EngagementType,
    },
    /// Show tenant configuration and cursors
    Status {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Upsert tenants from the tenants YAML file
    Seed,
    /// Run poll cycles on the configured cron schedule until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = engage_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = runtime::connect(&config).await?;

    match cli.command {
        Commands::Run { tenant, dry_run } => {
            let engine = runtime::build_engine(&config, pool, dry_run)?;
            let report = engine.run_cycle(tenant.as_deref()).await?;
            print_json(&report)?;
        }
        Commands::Poll {
            tenant,
            kind,
            dry_run,
        } => {
            let engine = runtime::build_engine(&config, pool, dry_run)?;
            let result = engine.poll_one(&tenant, kind).await?;
            print_json(&result)?;
        }
        Commands::ResetCursor { tenant, kind } => {
            let engine = runtime::build_engine(&config, pool, false)?;
            let existed = engine.reset_cursor(&tenant, kind).await?;
            print_json(&serde_json::json!({
                "tenant": tenant,
                "engagement_type": kind,
                "cleared": existed,
            }))?;
        }
        Commands::Status { tenant } => {
            let engine = runtime::build_engine(&config, pool, false)?;
            let statuses = engine.status(tenant.as_deref()).await?;
            print_json(&statuses)?;
        }
        Commands::Seed => {
            let count = seed::seed_from_file(&config, &pool).await?;
            println!("seeded {count} tenants from {}", config.tenants_path.display());
        }
        Commands::Schedule => {
            let engine = Arc::new(runtime::build_engine(&config, pool, false)?);
            scheduler::run(engine, &config.poll_cron).await?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
