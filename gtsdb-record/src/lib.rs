//! Conversion of the GTSDB traffic-sign dataset into sharded TFRecord files.
//!
//! The pipeline reads the flat `gt.txt` annotation file, validates every box
//! against its image, and packs one `Example` per image into fixed-size
//! shards.

pub mod annotation;
pub mod builder;
pub mod common;
pub mod config;
pub mod convert;
pub mod curation;
pub mod record;
pub mod shard;
pub mod validation;

pub use annotation::{AnnotationRow, AnnotationStore};
pub use builder::ImageAnnotationBuilder;
pub use config::Config;
pub use convert::{ConversionDriver, ConversionReport};
pub use curation::{Curation, CurationReport};
pub use record::{ImageRecord, ImageShape, NormalizedBox};
pub use shard::{read_shard, ShardName, ShardedRecordWriter};
pub use validation::{BoxIssue, BoxValidator, BoxVerdict};
