//! The conversion entry point.

use crate::{
    annotation::AnnotationStore,
    builder::ImageAnnotationBuilder,
    common::*,
    config::Config,
    curation::{self, Curation, CurationReport},
    shard::ShardedRecordWriter,
};

/// The result of one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// Shard files in shard order.
    pub shard_files: Vec<PathBuf>,
    pub num_records: usize,
    /// Present if the cleaning stage ran.
    pub curation: Option<CurationReport>,
}

/// Drives listing, optional curation and shard writing.
#[derive(Debug, Clone)]
pub struct ConversionDriver {
    config: Arc<Config>,
    store: Arc<AnnotationStore>,
}

impl ConversionDriver {
    /// Check the inputs and load the ground truth file. Fails before any
    /// output is created.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let store = AnnotationStore::open(config.gt_file(), config.annotation.match_policy)?;
        info!(
            "loaded {} annotations from '{}'",
            store.len(),
            config.gt_file().display()
        );

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The sorted identifiers found in the annotation directory.
    pub fn list_identifiers(&self) -> Result<Vec<String>> {
        let dir = self.config.annotation_dir();
        let extension = self.config.list_extension();

        let mut identifiers: Vec<String> = fs::read_dir(&dir)
            .with_context(|| format!("failed to list directory '{}'", dir.display()))?
            .map(|entry| -> Result<_> {
                let path = entry?.path();
                let matched = path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(extension);
                if !matched {
                    return Ok(None);
                }
                let stem = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .ok_or_else(|| format_err!("invalid file name '{}'", path.display()))?;
                Ok(Some(stem.to_owned()))
            })
            .filter_map(|result| result.transpose())
            .try_collect()?;

        identifiers.sort();
        Ok(identifiers)
    }

    /// Run the cleaning stage on `identifiers` regardless of the configuration.
    pub fn curate(&self, identifiers: Vec<String>) -> Result<Curation> {
        curation::curate(&self.config, &self.store, identifiers)
    }

    pub async fn run(&self) -> Result<ConversionReport> {
        let identifiers = self.list_identifiers()?;
        info!(
            "found {} images in '{}'",
            identifiers.len(),
            self.config.annotation_dir().display()
        );

        let (identifiers, curation) = if self.config.curation.delete_too_small {
            let Curation { kept, report } = self.curate(identifiers)?;
            (kept, Some(report))
        } else {
            (identifiers, None)
        };

        let identifiers = order_identifiers(identifiers, self.config.shuffle, self.config.seed);
        let num_records = identifiers.len();

        let builder = ImageAnnotationBuilder::new(self.config.clone(), self.store.clone());
        let writer = ShardedRecordWriter::from_builder(builder);
        let shard_files = writer.write_all(identifiers).await?;

        info!(
            "finished converting {} images into {} shards",
            num_records,
            shard_files.len()
        );

        Ok(ConversionReport {
            shard_files,
            num_records,
            curation,
        })
    }
}

/// Optionally shuffle `identifiers` with a seeded generator.
///
/// The same input and seed always give the same order.
pub fn order_identifiers(mut identifiers: Vec<String>, shuffle: bool, seed: u64) -> Vec<String> {
    if shuffle {
        let mut rng = StdRng::seed_from_u64(seed);
        identifiers.shuffle(&mut rng);
    }
    identifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SEED;

    fn identifiers(len: usize) -> Vec<String> {
        (0..len).map(|index| format!("{:05}", index)).collect()
    }

    #[test]
    fn unshuffled_order_is_kept() {
        assert_eq!(order_identifiers(identifiers(10), false, DEFAULT_SEED), identifiers(10));
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let first = order_identifiers(identifiers(100), true, DEFAULT_SEED);
        let second = order_identifiers(identifiers(100), true, DEFAULT_SEED);
        assert_eq!(first, second);
        assert_ne!(first, identifiers(100));
        assert_eq!(first.iter().sorted().cloned().collect_vec(), identifiers(100));
    }
}
