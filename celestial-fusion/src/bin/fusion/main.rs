//! Fusion: spatial search and cross-matching over catalog snapshots
//!
//! Loads a CSV or JSON snapshot, builds a candidate index and answers box,
//! cone and neighbour queries, or groups the snapshot by cross-matching.

mod cli;
mod output;
mod snapshot;

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use celestial_fusion::geometry::arcsec_to_deg;
use celestial_fusion::{
    CandidateIndex, Catalog, CatalogService, ConeQuery, EngineConfig, EntryId, HealpixIndex, Page,
    SortedIndex,
};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, IndexKind, PageArgs};
use snapshot::SnapshotRegistry;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = SnapshotRegistry::with_defaults();
    let catalog = registry.load(&cli.catalog)?;
    let config = load_config(cli.config.as_deref())?;

    let started = Instant::now();
    match cli.index {
        IndexKind::Sorted => {
            let index = SortedIndex::build(&catalog);
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "sorted index built");
            run(&cli, &registry, CatalogService::new(catalog, index, config)?)
        }
        IndexKind::Healpix => {
            let index = HealpixIndex::build(&catalog, cli.healpix_order);
            debug!(
                order = index.order(),
                pixels = index.occupied_pixels(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "healpix index built"
            );
            run(&cli, &registry, CatalogService::new(catalog, index, config)?)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid engine config {}", path.display()))?;
    info!(path = %path.display(), ?config, "engine config loaded");
    Ok(config)
}

fn page(args: &PageArgs) -> Page {
    Page::new(args.offset, args.limit)
}

fn run<I: CandidateIndex>(
    cli: &Cli,
    registry: &SnapshotRegistry,
    mut service: CatalogService<I>,
) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Info => {
            println!("{}", service.catalog().summary());
        }
        Commands::Box(args) => {
            let result = service.engine().search_box(
                args.ra_min,
                args.ra_max,
                args.dec_min,
                args.dec_max,
                page(&args.page),
            )?;
            output::print_entries(&result, args.page.offset, args.format)?;
        }
        Commands::Cone(args) => {
            let mut query =
                ConeQuery::new(args.ra, args.dec, args.radius).with_page(page(&args.page));
            if let Some(mag_max) = args.mag_max {
                query = query.with_max_mag(mag_max);
            }

            let start = args.timing.then(Instant::now);
            let result = service.engine().search(&query)?;
            if let Some(start_time) = start {
                eprintln!(
                    "Query completed in {:.2} ms",
                    start_time.elapsed().as_secs_f64() * 1000.0
                );
            }

            output::print_matches(&result, args.page.offset, args.format)?;
        }
        Commands::Near(args) => {
            let result = service.engine().find_near(
                &EntryId::new(args.id.as_str()),
                arcsec_to_deg(args.radius_arcsec),
                page(&args.page),
            )?;
            output::print_matches(&result, args.page.offset, args.format)?;
        }
        Commands::CrossMatch(args) => {
            let start = Instant::now();
            let stats = service.cross_match(args.tolerance, !args.keep_existing)?;
            eprintln!(
                "Cross-match completed in {:.2} s",
                start.elapsed().as_secs_f64()
            );
            output::print_stats(&stats, args.format)?;

            let catalog: &Catalog = service.catalog();
            if let Some(path) = &args.assignments {
                let written = output::write_assignments(catalog, path)?;
                info!(path = %path.display(), written, "group assignments written");
            }
            if let Some(path) = &args.output {
                registry.save(catalog, path)?;
            }
        }
    }
    Ok(())
}
