use anyhow::Result;
use gtsdb_record::{
    config::{InvalidBoxPolicy, MatchPolicy, ShapeSource},
    Config,
};
use std::path::Path;

#[test]
fn load_sample_config() -> Result<()> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("convert.json5");
    let config = Config::open(&path)?;

    assert_eq!(config.name, "gtsdb_test");
    assert_eq!(config.shard_size.get(), 2000);
    assert_eq!(config.seed, 12345);
    assert_eq!(config.shape, ShapeSource::GTSDB);
    assert_eq!(config.annotation.match_policy, MatchPolicy::Exact);
    assert_eq!(config.validation.invalid_boxes, InvalidBoxPolicy::Drop);
    assert!(!config.curation.delete_too_small);
    assert_eq!(config.gt_file(), Path::new("test/gt.txt"));

    Ok(())
}
