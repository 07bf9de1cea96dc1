use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing::Level;
use validator::Validate;

use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::models::TableAsset;
use crate::processors::{SchemaCensus, TabularPipeline};
use crate::readers::read_file_list;
use crate::utils::progress::ProgressReporter;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = PipelineConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::CreateGeoparquet {
            file_list,
            frequency,
            period,
            destination,
            partitions,
            envelope,
            compression,
            row_group_size,
            max_workers,
            metadata_dir,
            mmap,
            asset_json,
            quiet,
        } => {
            if let Some(partitions) = partitions {
                config.partition_count = partitions;
            }
            if let Some(envelope) = envelope {
                config.envelope = envelope;
            }
            if let Some(compression) = compression {
                config.compression = compression;
            }
            if let Some(size) = row_group_size {
                config.row_group_size = size;
            }
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            if metadata_dir.is_some() {
                config.metadata_dir = metadata_dir;
            }
            config.use_mmap |= mmap;
            config.validate().context("Invalid settings")?;

            let hrefs = read_file_list(&file_list)
                .with_context(|| format!("Failed to read file list {}", file_list.display()))?;

            println!("Creating GeoParquet for {} {}...", frequency.display_name(), period);
            println!("Sources: {}", hrefs.len());
            println!("Destination: {}", destination.display());
            println!(
                "Partitions: {}, Workers: {}, Envelope: {}",
                config.partition_count, config.max_workers, config.envelope
            );

            let pipeline = TabularPipeline::from_config(config)?;
            let report = tokio::task::spawn_blocking(move || {
                let progress =
                    ProgressReporter::new(hrefs.len() as u64, "Reading CSV files...", quiet);
                pipeline.create_geoparquet(&hrefs, frequency, period, &destination, Some(&progress))
            })
            .await??;

            println!("\n{}", report.summary());
            for warning in &report.warnings {
                println!("⚠️  {}", warning);
            }

            if let Some(path) = asset_json {
                write_asset(&report.asset, &path)?;
                println!("Table asset written to {}", path.display());
            }

            println!("Processing complete!");
        }

        Commands::Describe {
            parquet,
            frequency,
            period,
            envelope,
            metadata_dir,
            output,
        } => {
            if let Some(envelope) = envelope {
                config.envelope = envelope;
            }
            if metadata_dir.is_some() {
                config.metadata_dir = metadata_dir;
            }

            let pipeline = TabularPipeline::from_config(config)?;
            let (asset, warnings) = tokio::task::spawn_blocking(move || {
                pipeline.describe_existing(&parquet, frequency, period)
            })
            .await??;

            for warning in &warnings {
                eprintln!("⚠️  {}", warning);
            }

            match output {
                Some(path) => {
                    write_asset(&asset, &path)?;
                    println!("Table asset written to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&asset)?),
            }
        }

        Commands::CheckSchema { dir } => {
            println!("Checking CSV schemas in {}", dir.display());

            let census = tokio::task::spawn_blocking(move || SchemaCensus::from_dir(&dir))
                .await?
                .context("Schema census failed")?;

            println!("\n{}", census.summary());
            if census.is_uniform() {
                println!("✅ All files share one schema");
            } else {
                println!("⚠️  Files disagree on their columns");
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

fn write_asset(asset: &TableAsset, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(asset)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
