//! peepal: command-line front end for the Peepal toilet finder.
//!
//! Usage examples
//! --------------
//!
//! - Five closest toilets within 1 km
//!   $ peepal --seed toilets.json nearby --lat 1.3040 --lon 103.8300 -r 1
//!
//! - Address search, only places known to have a bidet or not recorded
//!   $ peepal --seed toilets.json search "orchard road" --lat 1.30 --lon 103.83 --bidet true
//!
//! - Report a listing (the seed file is updated in place)
//!   $ peepal --seed toilets.json report-toilet t-orchard
//!
//! - Walking route, needs `PEEPAL_MAPKIT_AUTH_TOKEN`
//!   $ peepal --seed toilets.json navigate t-orchard --lat 1.3 --lon 103.83
//!
//! Output is JSON on stdout; logs go to stderr and follow `RUST_LOG`.
mod args;

use std::{fs, io, path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use peepal_core::{
    Backend, PeepalService, ToiletStore,
    config::Config,
    model::{Coordinate, NavigateRequest, NearbyRequest, ReviewId, SearchRequest, ToiletId},
};
use peepal_provider_mapkit as mapkit;
use peepal_store_memory::{MemoryStore, Seed};

use crate::args::{CliArgs, Commands, Position};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("peepal=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env().context("invalid PEEPAL_* configuration")?;

    let seed = match &args.seed {
        Some(path) => load_seed(path)?,
        None => Seed::default(),
    };
    let store = Arc::new(MemoryStore::new(seed).context("invalid seed")?);

    // HTTP + service setup
    let client = Client::builder().user_agent("peepal/0.1").build()?;
    let provider = mapkit::ports(client, &config);
    let backend = Backend {
        toilets: Arc::clone(&store) as Arc<dyn ToiletStore>,
        toilet_reports: store.toilet_reports(),
        review_reports: store.review_reports(),
        directions: provider.directions,
        tokens: provider.tokens,
    };
    let service = PeepalService::new(&config, backend)?;

    let mutated = matches!(
        args.command,
        Commands::ReportToilet { .. } | Commands::ReportReview { .. }
    );

    let output = run(&service, args.command).await?;
    print_json(&output);

    if mutated && let Some(path) = &args.seed {
        let json = store.snapshot().await.to_json()?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "seed updated");
    }

    Ok(())
}

async fn run(service: &PeepalService, command: Commands) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Nearby {
            position,
            radius,
            limit,
        } => {
            let request = NearbyRequest {
                latitude: position.latitude,
                longitude: position.longitude,
                radius,
                limit,
            };
            serde_json::to_value(service.nearby(&request).await?)?
        }
        Commands::Search {
            query,
            position,
            handicap,
            bidet,
            shower,
            sanitiser,
        } => {
            let origin = parse_position(&position)?;
            let request = SearchRequest {
                query,
                latitude: origin.latitude,
                longitude: origin.longitude,
                handicap_avail: handicap,
                bidet_avail: bidet,
                shower_avail: shower,
                sanitiser_avail: sanitiser,
            };
            serde_json::to_value(service.search(&request).await?)?
        }
        Commands::Details { id } => {
            serde_json::to_value(service.details(&ToiletId(id)).await?)?
        }
        Commands::ReportToilet { id } => {
            serde_json::to_value(service.report_toilet(&ToiletId(id)).await?)?
        }
        Commands::ReportReview { id } => {
            serde_json::to_value(service.report_review(&ReviewId(id)).await?)?
        }
        Commands::Navigate { id, position } => {
            let origin = parse_position(&position)?;
            let request = NavigateRequest {
                latitude: origin.latitude,
                longitude: origin.longitude,
            };
            serde_json::to_value(service.navigate(&ToiletId(id), &request).await?)?
        }
    };
    Ok(value)
}

fn parse_position(position: &Position) -> Result<Coordinate> {
    Ok(Coordinate::parse(&position.latitude, &position.longitude)?)
}

fn load_seed(path: &Path) -> Result<Seed> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Seed::from_json(&raw)?)
}

#[expect(clippy::print_stdout, reason = "command output is JSON on stdout")]
fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
