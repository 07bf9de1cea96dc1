use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{Frequency, Period};
use crate::processors::EnvelopePolicy;

#[derive(Parser)]
#[command(name = "normals-processor")]
#[command(about = "NOAA U.S. Climate Normals CSV to GeoParquet converter")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Configuration file (TOML, JSON or YAML); NORMALS_* variables override it"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a list of station CSV files into a GeoParquet artifact
    CreateGeoparquet {
        #[arg(help = "Text file with one CSV path or URL per line")]
        file_list: PathBuf,

        #[arg(help = "hourly, daily, monthly or annualseasonal")]
        frequency: Frequency,

        #[arg(help = "1981-2010, 1991-2020 or 2006-2020")]
        period: Period,

        #[arg(help = "Directory receiving {period}-{frequency}.parquet")]
        destination: PathBuf,

        #[arg(short, long, help = "Number of output partitions")]
        partitions: Option<usize>,

        #[arg(long, help = "convex_hull or bounding_box")]
        envelope: Option<EnvelopePolicy>,

        #[arg(short, long, help = "snappy, gzip, lz4, zstd or none")]
        compression: Option<String>,

        #[arg(long)]
        row_group_size: Option<usize>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, help = "Directory of {frequency}_{period}.json column metadata")]
        metadata_dir: Option<PathBuf>,

        #[arg(long, help = "Memory-map local CSV files")]
        mmap: bool,

        #[arg(long, help = "Write the table asset JSON to this path")]
        asset_json: Option<PathBuf>,

        #[arg(short, long, help = "Hide the progress bar")]
        quiet: bool,
    },

    /// Describe an existing GeoParquet artifact as a table asset
    Describe {
        #[arg(help = "GeoParquet file or partition directory")]
        parquet: PathBuf,

        frequency: Frequency,

        period: Period,

        #[arg(long, help = "convex_hull or bounding_box")]
        envelope: Option<EnvelopePolicy>,

        #[arg(long)]
        metadata_dir: Option<PathBuf>,

        #[arg(short, long, help = "Write the table asset JSON here instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Count CSV headers across a directory to check schema consistency
    CheckSchema {
        #[arg(help = "Directory of station CSV files")]
        dir: PathBuf,
    },
}
