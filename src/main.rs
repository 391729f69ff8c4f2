use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod db;
mod error;
mod executor;
mod export;
mod filters;
mod http;
mod models;
mod report;
mod store;

use crate::store::Store;

#[derive(Parser)]
#[command(name = "mall-feedback-dashboard")]
#[command(about = "Monthly mall feedback and foot-traffic dashboard", long_about = None)]
struct Cli {
    /// Maximum pooled Postgres connections
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 10, global = true)]
    max_connections: u32,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Selection {
    #[arg(long)]
    year: i32,
    #[arg(long)]
    mall: String,
    /// Restrict to a single month (1-12)
    #[arg(long)]
    month: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the base tables behind the monthly views
    InitDb,
    /// Load demo rows and create monthly views for a year
    Seed {
        #[arg(long)]
        year: i32,
    },
    /// Serve the dashboard API and static assets
    Serve {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        #[arg(long, default_value = "public")]
        public_dir: PathBuf,
    },
    /// Print selectable years and malls as JSON
    Filters,
    /// Print the top captions per month as JSON
    Top3 {
        #[command(flatten)]
        selection: Selection,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the top captions per month as CSV
    Export {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, default_value = "top3.csv")]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the dashboard Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store: Arc<dyn Store> = Arc::new(db::PgStore::new(pool.clone()));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { year } => {
            db::seed(&pool, year).await?;
            println!("Seed data and views ready for {year}.");
        }
        Commands::Serve { port, public_dir } => {
            http::serve(http::AppState::new(store), port, public_dir).await?;
        }
        Commands::Filters => {
            let filters = filters::FilterService::new(store).compute_filters().await?;
            println!("{}", serde_json::to_string_pretty(&filters)?);
        }
        Commands::Top3 { selection } => {
            let report = build(store, &selection).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Report { selection, out } => {
            let report = build(store, &selection).await?;
            let markdown = report::render_markdown(&report, chrono::Utc::now());
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { selection, csv } => {
            let report = build(store, &selection).await?;
            let rows = export::write_csv(&csv, &report)?;
            println!("Exported {rows} rows to {}.", csv.display());
        }
    }

    Ok(())
}

async fn build(store: Arc<dyn Store>, selection: &Selection) -> anyhow::Result<models::Top3Report> {
    let report = report::ReportOrchestrator::new(store)
        .build_report(selection.year, &selection.mall, selection.month)
        .await?;
    Ok(report)
}
