//! Conversion program configuration format.

use crate::common::*;

pub use annotation::*;
pub use curation::*;
pub use shape::*;
pub use validation::*;

pub const DEFAULT_SHARD_SIZE: NonZeroUsize = match NonZeroUsize::new(2000) {
    Some(size) => size,
    None => panic!("shard size must be non-zero"),
};
pub const DEFAULT_SEED: u64 = 12345;

/// The main conversion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The directory holding `<identifier>.<image_extension>` files.
    pub dataset_dir: PathBuf,
    /// The subdirectory enumerated for identifiers. Defaults to `dataset_dir` itself.
    #[serde(default)]
    pub annotation_subdir: Option<PathBuf>,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    /// The extension of enumerated entries. Defaults to `image_extension`.
    #[serde(default)]
    pub list_extension: Option<String>,
    /// The ground truth file. Defaults to `<dataset_dir>/gt.txt`.
    #[serde(default)]
    pub gt_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// The prefix of output shard files.
    pub name: String,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// The maximum number of records per shard.
    #[serde(default = "default_shard_size")]
    pub shard_size: NonZeroUsize,
    #[serde(default)]
    pub shape: ShapeSource,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub curation: CurationConfig,
}

impl Config {
    /// Create a configuration with default options.
    pub fn new(
        dataset_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            annotation_subdir: None,
            image_extension: default_image_extension(),
            list_extension: None,
            gt_file: None,
            output_dir: output_dir.into(),
            name: name.into(),
            shuffle: false,
            seed: DEFAULT_SEED,
            shard_size: DEFAULT_SHARD_SIZE,
            shape: ShapeSource::default(),
            annotation: AnnotationConfig::default(),
            validation: ValidationConfig::default(),
            curation: CurationConfig::default(),
        }
    }

    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Check that every input the conversion reads is present.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.dataset_dir.is_dir(),
            "the dataset directory '{}' does not exist",
            self.dataset_dir.display()
        );
        let annotation_dir = self.annotation_dir();
        ensure!(
            annotation_dir.is_dir(),
            "the annotation directory '{}' does not exist",
            annotation_dir.display()
        );
        let gt_file = self.gt_file();
        ensure!(
            gt_file.is_file(),
            "the ground truth file '{}' does not exist",
            gt_file.display()
        );
        ensure!(!self.name.is_empty(), "the dataset name must not be empty");
        if let ShapeSource::Fixed { height, width } = self.shape {
            ensure!(
                height > 0 && width > 0,
                "the fixed image shape must be positive"
            );
        }
        Ok(())
    }

    pub fn annotation_dir(&self) -> PathBuf {
        match &self.annotation_subdir {
            Some(subdir) => self.dataset_dir.join(subdir),
            None => self.dataset_dir.clone(),
        }
    }

    pub fn gt_file(&self) -> PathBuf {
        self.gt_file
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join("gt.txt"))
    }

    pub fn list_extension(&self) -> &str {
        self.list_extension
            .as_deref()
            .unwrap_or(&self.image_extension)
    }

    pub fn image_path(&self, identifier: &str) -> PathBuf {
        self.dataset_dir
            .join(format!("{}.{}", identifier, self.image_extension))
    }
}

mod shape {
    use super::*;

    /// Where image dimensions come from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "type")]
    pub enum ShapeSource {
        /// Read height and width from the image header.
        Probe,
        /// Assume every image has the same dimensions.
        Fixed { height: usize, width: usize },
    }

    impl ShapeSource {
        /// The uniform GTSDB image dimensions.
        pub const GTSDB: Self = Self::Fixed {
            height: 800,
            width: 1360,
        };
    }

    impl Default for ShapeSource {
        fn default() -> Self {
            Self::Probe
        }
    }
}

mod annotation {
    use super::*;

    /// Ground truth lookup options.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct AnnotationConfig {
        #[serde(default)]
        pub match_policy: MatchPolicy,
    }

    /// How a ground truth line is assigned to an identifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum MatchPolicy {
        /// The first field, without extension, equals the identifier.
        Exact,
        /// The raw line starts with the identifier.
        ///
        /// `img1` also claims the lines of `img10`.
        Prefix,
    }

    impl Default for MatchPolicy {
        fn default() -> Self {
            Self::Exact
        }
    }
}

mod validation {
    use super::*;

    /// Bounding box sanity check options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ValidationConfig {
        /// Boxes touching this many pixels of the image border are out of bound.
        #[serde(default = "default_border_margin")]
        pub border_margin: i64,
        /// Boxes narrower or shorter than this many pixels are too small.
        #[serde(default = "default_min_box_size")]
        pub min_box_size: i64,
        #[serde(default)]
        pub invalid_boxes: InvalidBoxPolicy,
    }

    impl Default for ValidationConfig {
        fn default() -> Self {
            Self {
                border_margin: default_border_margin(),
                min_box_size: default_min_box_size(),
                invalid_boxes: InvalidBoxPolicy::default(),
            }
        }
    }

    /// What to do with out-of-bound and malformed boxes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum InvalidBoxPolicy {
        /// Leave the box out of the emitted record.
        Drop,
        /// Emit the box anyway.
        Keep,
    }

    impl Default for InvalidBoxPolicy {
        fn default() -> Self {
            Self::Drop
        }
    }

    fn default_border_margin() -> i64 {
        1
    }

    fn default_min_box_size() -> i64 {
        20
    }
}

mod curation {
    use super::*;

    /// Dataset cleaning options.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct CurationConfig {
        /// Delete images holding a too small box before conversion.
        #[serde(default)]
        pub delete_too_small: bool,
    }
}

fn default_image_extension() -> String {
    "jpg".into()
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_shard_size() -> NonZeroUsize {
    DEFAULT_SHARD_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_defaults() {
        let config: Config = json5::from_str(
            r#"{
                dataset_dir: "test/",
                output_dir: "tfrecords/",
                name: "gtsdb_test",
            }"#,
        )
        .unwrap();

        assert_eq!(config.shard_size.get(), 2000);
        assert_eq!(config.seed, 12345);
        assert!(!config.shuffle);
        assert_eq!(config.shape, ShapeSource::Probe);
        assert_eq!(config.annotation.match_policy, MatchPolicy::Exact);
        assert_eq!(config.validation.invalid_boxes, InvalidBoxPolicy::Drop);
        assert_eq!(config.validation.min_box_size, 20);
        assert!(!config.curation.delete_too_small);
        assert_eq!(config.gt_file(), Path::new("test/gt.txt"));
        assert_eq!(config.image_path("00001"), Path::new("test/00001.jpg"));
        assert_eq!(config.list_extension(), "jpg");
    }

    #[test]
    fn tagged_shape_source() {
        let config: Config = json5::from_str(
            r#"{
                dataset_dir: "train/",
                output_dir: "tfrecords/",
                name: "gtsdb_train",
                shape: { type: "Fixed", height: 800, width: 1360 },
                annotation: { match_policy: "Prefix" },
                validation: { invalid_boxes: "Keep" },
                shard_size: 10,
            }"#,
        )
        .unwrap();

        assert_eq!(config.shape, ShapeSource::GTSDB);
        assert_eq!(config.annotation.match_policy, MatchPolicy::Prefix);
        assert_eq!(config.validation.invalid_boxes, InvalidBoxPolicy::Keep);
        assert_eq!(config.shard_size.get(), 10);
    }

    #[test]
    fn zero_shard_size_is_rejected() {
        let result: Result<Config, _> = json5::from_str(
            r#"{ dataset_dir: "a", output_dir: "b", name: "c", shard_size: 0 }"#,
        );
        assert!(result.is_err());
    }
}
