//! Sharded TFRecord writing and reading.

use crate::{builder::ImageAnnotationBuilder, common::*, record::ImageRecord};

static SHARD_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+)_(?P<index>\d+)-of-(?P<count>\d+)-total(?P<records>\d+)\.tfrecord$")
        .unwrap()
});

/// The identity of one shard file, recoverable from its file name.
///
/// The file name is `<name>_<index + 1>-of-<count>-total<records>.tfrecord`
/// with numbers padded to five digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardName {
    pub name: String,
    /// Zero-based shard index.
    pub index: usize,
    pub count: usize,
    pub records: usize,
}

impl ShardName {
    pub fn file_name(&self) -> String {
        format!(
            "{}_{:05}-of-{:05}-total{:05}.tfrecord",
            self.name,
            self.index + 1,
            self.count,
            self.records
        )
    }

    pub fn parse(file_name: &str) -> Result<Self> {
        let captures = SHARD_NAME_REGEX
            .captures(file_name)
            .ok_or_else(|| format_err!("'{}' is not a shard file name", file_name))?;
        let number = |key: &str| -> Result<usize> {
            let text = &captures[key];
            text.parse()
                .with_context(|| format!("invalid {} '{}' in '{}'", key, text, file_name))
        };

        let position = number("index")?;
        let count = number("count")?;
        ensure!(
            position >= 1 && position <= count,
            "shard position {} is out of range 1..={} in '{}'",
            position,
            count,
            file_name
        );

        Ok(Self {
            name: captures["name"].to_owned(),
            index: position - 1,
            count,
            records: number("records")?,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format_err!("invalid shard path '{}'", path.display()))?;
        Self::parse(file_name)
    }
}

impl Display for ShardName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// A contiguous slice of the identifier list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPlan {
    pub index: usize,
    pub count: usize,
    pub range: Range<usize>,
}

impl ShardPlan {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Split `len` items into `ceil(len / shard_size)` shards by position.
pub fn plan_shards(len: usize, shard_size: NonZeroUsize) -> Vec<ShardPlan> {
    let shard_size = shard_size.get();
    let count = (len + shard_size - 1) / shard_size;
    (0..count)
        .map(|index| {
            let start = index * shard_size;
            let end = ((index + 1) * shard_size).min(len);
            ShardPlan {
                index,
                count,
                range: start..end,
            }
        })
        .collect()
}

/// Writes one shard file per slice of the identifier list.
#[derive(Debug, Clone)]
pub struct ShardedRecordWriter {
    builder: ImageAnnotationBuilder,
    output_dir: PathBuf,
    name: String,
    shard_size: NonZeroUsize,
}

impl ShardedRecordWriter {
    pub fn new(
        builder: ImageAnnotationBuilder,
        output_dir: impl Into<PathBuf>,
        name: impl Into<String>,
        shard_size: NonZeroUsize,
    ) -> Self {
        Self {
            builder,
            output_dir: output_dir.into(),
            name: name.into(),
            shard_size,
        }
    }

    pub fn from_builder(builder: ImageAnnotationBuilder) -> Self {
        let config = builder.config();
        let output_dir = config.output_dir.clone();
        let name = config.name.clone();
        let shard_size = config.shard_size;
        Self::new(builder, output_dir, name, shard_size)
    }

    /// Write every shard concurrently and return the shard paths in shard order.
    pub async fn write_all(&self, identifiers: Vec<String>) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "failed to create output directory '{}'",
                self.output_dir.display()
            )
        })?;

        let identifiers: Arc<[String]> = identifiers.into();
        let plans = plan_shards(identifiers.len(), self.shard_size);
        let writer = Arc::new(self.clone());

        let paths: Vec<_> = stream::iter(plans)
            .par_map(None, move |plan| {
                let writer = writer.clone();
                let identifiers = identifiers.clone();
                move || writer.write_shard(&identifiers, &plan)
            })
            .try_collect()
            .await?;

        Ok(paths)
    }

    /// Write the shard described by `plan`, one record per identifier in list order.
    pub fn write_shard(&self, identifiers: &[String], plan: &ShardPlan) -> Result<PathBuf> {
        let ShardPlan {
            index,
            count,
            ref range,
        } = *plan;
        let slice = identifiers.get(range.clone()).ok_or_else(|| {
            format_err!(
                "shard range {:?} exceeds {} identifiers",
                range,
                identifiers.len()
            )
        })?;

        let shard_name = ShardName {
            name: self.name.clone(),
            index,
            count,
            records: slice.len(),
        };
        let path = self.output_dir.join(shard_name.file_name());

        let mut writer: ExampleWriter<BufWriter<File>> = ExampleWriter::create(&path)
            .with_context(|| format!("failed to create shard file '{}'", path.display()))?;

        for (offset, identifier) in slice.iter().enumerate() {
            info!(
                "converting image {}/{} {} shard {}",
                range.start + offset + 1,
                identifiers.len(),
                identifier,
                index + 1
            );
            let record = self.builder.build(identifier)?;
            writer
                .send(record.to_example())
                .with_context(|| format!("failed to write shard file '{}'", path.display()))?;
        }

        writer
            .flush()
            .with_context(|| format!("failed to flush shard file '{}'", path.display()))?;

        Ok(path)
    }
}

/// Read every record of a shard file, in file order.
pub fn read_shard(path: impl AsRef<Path>) -> Result<Vec<ImageRecord>> {
    let path = path.as_ref();
    let reader: ExampleIter<BufReader<File>> = ExampleIter::open(path, Default::default())
        .with_context(|| format!("failed to open shard file '{}'", path.display()))?;

    reader
        .enumerate()
        .map(|(index, example)| -> Result<_> {
            let example = example.with_context(|| {
                format!("failed to read record {} of '{}'", index, path.display())
            })?;
            ImageRecord::from_example(&example).with_context(|| {
                format!("failed to decode record {} of '{}'", index, path.display())
            })
        })
        .try_collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_size(size: usize) -> NonZeroUsize {
        NonZeroUsize::new(size).unwrap()
    }

    #[test]
    fn shard_file_name() {
        let name = ShardName {
            name: "gtsdb_train".into(),
            index: 0,
            count: 2,
            records: 2000,
        };
        let file_name = name.file_name();
        assert_eq!(file_name, "gtsdb_train_00001-of-00002-total02000.tfrecord");
        assert_eq!(ShardName::parse(&file_name).unwrap(), name);
        assert_eq!(name.to_string(), file_name);
    }

    #[test]
    fn parse_shard_path() {
        let path = Path::new("tfrecords/gtsdb_test_00002-of-00002-total00001.tfrecord");
        let name = ShardName::from_path(path).unwrap();
        assert_eq!(name.name, "gtsdb_test");
        assert_eq!(name.index, 1);
        assert_eq!(name.count, 2);
        assert_eq!(name.records, 1);
    }

    #[test]
    fn reject_bad_shard_names() {
        assert!(ShardName::parse("gtsdb_test.tfrecord").is_err());
        assert!(ShardName::parse("gtsdb_test_00003-of-00002-total00001.tfrecord").is_err());
        assert!(ShardName::parse("gtsdb_test_00000-of-00002-total00001.tfrecord").is_err());
    }

    #[test]
    fn shard_plans_cover_the_list() {
        for (len, size) in [(0, 2000), (1, 2000), (3, 2), (4, 2), (2000, 2000), (4001, 2000)] {
            let plans = plan_shards(len, shard_size(size));
            let expected_count = (len + size - 1) / size;
            assert_eq!(plans.len(), expected_count);
            assert_eq!(plans.iter().map(ShardPlan::len).sum::<usize>(), len);
            assert!(plans.iter().all(|plan| plan.count == expected_count));
            assert!(plans.iter().all(|plan| !plan.is_empty() && plan.len() <= size));
            plans.iter().tuple_windows().for_each(|(prev, next)| {
                assert_eq!(prev.range.end, next.range.start);
            });
        }
    }

    #[test]
    fn last_shard_takes_the_remainder() {
        let plans = plan_shards(3, shard_size(2));
        assert_eq!(plans[0].range, 0..2);
        assert_eq!(plans[1].range, 2..3);
        assert_eq!(plans[1].index, 1);
    }
}
