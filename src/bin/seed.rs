//! Seed the database with routing targets from a JSON file.
//!
//! Usage: `seed --file seeds.json`

use clap::Parser;
use concierge::{config::ConfigLoader, db, seeds, telemetry};
use migration::MigratorTrait;

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Load cities, categories, and providers")]
struct Args {
    /// Path to the JSON seed file
    #[arg(long, short)]
    file: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;

    let database = db::init_pool(&config).await?;
    migration::Migrator::up(&database, None).await?;

    let contents = std::fs::read_to_string(&args.file)?;
    let spec: seeds::SeedSpec = serde_json::from_str(&contents)?;

    let created = seeds::apply(&database, spec).await?;
    tracing::info!(created, "Seeding complete");

    Ok(())
}
