use anyhow::{ensure, Context, Result};
use gtsdb_record::{read_shard, Config, ConversionDriver, ShardName};
use log::{info, warn, LevelFilter};
use prettytable::{cell, row, Table};
use std::{
    env,
    path::{Path, PathBuf},
};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Convert the GTSDB dataset into sharded TFRecord files.
enum Args {
    /// Write shard files from a dataset directory.
    Convert {
        #[structopt(long, default_value = "convert.json5")]
        /// configuration file
        config_file: PathBuf,
        #[structopt(long)]
        /// shuffle images with the configured seed
        shuffle: bool,
    },
    /// Delete images holding too small boxes.
    Curate {
        #[structopt(long, default_value = "convert.json5")]
        /// configuration file
        config_file: PathBuf,
    },
    /// Summarize shard files.
    Inspect {
        /// shard files
        shard_files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut builder = pretty_env_logger::formatted_builder();
    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };
    builder.init();

    match Args::from_args() {
        Args::Convert {
            config_file,
            shuffle,
        } => {
            let mut config = open_config(&config_file)?;
            config.shuffle |= shuffle;
            convert(config).await?;
        }
        Args::Curate { config_file } => {
            let config = open_config(&config_file)?;
            curate(config)?;
        }
        Args::Inspect { shard_files } => inspect(shard_files)?,
    }

    Ok(())
}

fn open_config(config_file: &Path) -> Result<Config> {
    Config::open(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))
}

async fn convert(config: Config) -> Result<()> {
    let report = ConversionDriver::new(config)?.run().await?;
    report
        .shard_files
        .iter()
        .for_each(|path| println!("{}", path.display()));
    info!("finished converting the GTSDB dataset");
    Ok(())
}

fn curate(config: Config) -> Result<()> {
    let driver = ConversionDriver::new(config)?;
    let identifiers = driver.list_identifiers()?;
    let curation = driver.curate(identifiers)?;
    let report = &curation.report;
    info!(
        "{} images flagged, {} deleted, {} already missing, {} kept",
        report.flagged.len(),
        report.deleted.len(),
        report.missing.len(),
        curation.kept.len()
    );
    Ok(())
}

fn inspect(shard_files: Vec<PathBuf>) -> Result<()> {
    ensure!(!shard_files.is_empty(), "no shard files are given");

    let mut table = Table::new();
    table.add_row(row!["file", "shard", "records", "objects", "classes"]);

    for path in &shard_files {
        let records = read_shard(path)?;
        let num_objects: usize = records.iter().map(|record| record.num_objects()).sum();
        let mut classes: Vec<_> = records
            .iter()
            .flat_map(|record| record.labels.iter().copied())
            .collect();
        classes.sort_unstable();
        classes.dedup();

        let shard = match ShardName::from_path(path) {
            Ok(name) => {
                if name.records != records.len() {
                    warn!(
                        "'{}' declares {} records, but holds {}",
                        path.display(),
                        name.records,
                        records.len()
                    );
                }
                format!("{}/{}", name.index + 1, name.count)
            }
            Err(_) => "-".to_string(),
        };

        table.add_row(row![
            path.display(),
            shard,
            records.len(),
            num_objects,
            classes.len()
        ]);
    }

    table.printstd();
    Ok(())
}
