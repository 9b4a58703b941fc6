//! CLI argument definitions for fusion

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IndexKind {
    /// Declination-sorted index
    Sorted,
    /// Nested HEALPix buckets
    Healpix,
}

#[derive(Parser)]
#[command(name = "fusion")]
#[command(about = "Spatial search and cross-matching over catalog snapshots")]
#[command(version)]
pub struct Cli {
    /// Catalog snapshot (.csv or .json)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Candidate index used for searches
    #[arg(long, value_enum, default_value = "sorted", global = true)]
    pub index: IndexKind,

    /// HEALPix order for `--index healpix` (nside = 2^order)
    #[arg(long, default_value = "8", global = true)]
    pub healpix_order: u32,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print snapshot summary
    Info,

    /// Search a literal RA/Dec rectangle (ra_min > ra_max crosses 0°)
    Box(BoxArgs),

    /// Search a cone, nearest first
    Cone(ConeArgs),

    /// Find entries near an existing entry
    Near(NearArgs),

    /// Group entries within a tolerance radius
    CrossMatch(CrossMatchArgs),
}

#[derive(Parser)]
pub struct PageArgs {
    /// Results to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Parser)]
pub struct BoxArgs {
    /// Lower RA bound in degrees
    #[arg(allow_negative_numbers = true)]
    pub ra_min: f64,
    /// Upper RA bound in degrees
    #[arg(allow_negative_numbers = true)]
    pub ra_max: f64,
    /// Lower Dec bound in degrees
    #[arg(allow_negative_numbers = true)]
    pub dec_min: f64,
    /// Upper Dec bound in degrees
    #[arg(allow_negative_numbers = true)]
    pub dec_max: f64,

    #[command(flatten)]
    pub page: PageArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Parser)]
pub struct ConeArgs {
    /// Right ascension in degrees
    #[arg(allow_negative_numbers = true)]
    pub ra: f64,
    /// Declination in degrees
    #[arg(allow_negative_numbers = true)]
    pub dec: f64,

    /// Search radius in degrees
    #[arg(long, default_value = "1.0")]
    pub radius: f64,

    /// Maximum magnitude filter
    #[arg(long, allow_negative_numbers = true)]
    pub mag_max: Option<f64>,

    #[command(flatten)]
    pub page: PageArgs,

    /// Print query timing
    #[arg(long)]
    pub timing: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Parser)]
pub struct NearArgs {
    /// Entry id to search around
    pub id: String,

    /// Search radius in arcseconds
    #[arg(long, default_value = "10.0")]
    pub radius_arcsec: f64,

    #[command(flatten)]
    pub page: PageArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Parser)]
pub struct CrossMatchArgs {
    /// Match tolerance in arcseconds
    #[arg(long, default_value = "2.0")]
    pub tolerance: f64,

    /// Keep existing group ids and merge new matches into them
    #[arg(long)]
    pub keep_existing: bool,

    /// Write `entry_id,group_id` pairs to this CSV file
    #[arg(long)]
    pub assignments: Option<PathBuf>,

    /// Write the grouped snapshot to this file (.csv or .json)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output format for the statistics
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}
