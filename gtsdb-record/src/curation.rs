//! The explicit dataset cleaning stage.
//!
//! Images holding a too small box are removed from disk and from the
//! identifier list before any shard is written.

use crate::{annotation::AnnotationStore, common::*, config::Config, validation::BoxValidator};

/// What the cleaning stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurationReport {
    /// Identifiers holding at least one too small box, in list order.
    pub flagged: Vec<String>,
    /// Image files removed by this run.
    pub deleted: Vec<PathBuf>,
    /// Flagged image files that were already gone.
    pub missing: Vec<PathBuf>,
}

/// The outcome of the cleaning stage.
#[derive(Debug, Clone)]
pub struct Curation {
    /// The identifiers left for conversion, in their original order.
    pub kept: Vec<String>,
    pub report: CurationReport,
}

/// Identifiers owning a too small box. Does not touch the filesystem.
pub fn flag_too_small(
    identifiers: &[String],
    store: &AnnotationStore,
    validator: &BoxValidator,
) -> Vec<String> {
    let mut visited = HashSet::new();
    identifiers
        .iter()
        .filter(|&identifier| visited.insert(identifier.as_str()))
        .filter(|identifier| {
            store.rows_for(identifier).into_iter().any(|row| {
                let too_small = validator.is_too_small(&row.pixel_box());
                if too_small {
                    warn!("too small {}", row.line);
                }
                too_small
            })
        })
        .cloned()
        .collect()
}

/// Remove the image files of `flagged`. A missing file is not an error.
pub fn delete_images(config: &Config, flagged: &[String]) -> Result<CurationReport> {
    let mut report = CurationReport {
        flagged: flagged.to_vec(),
        ..Default::default()
    };

    for identifier in flagged {
        let path = config.image_path(identifier);
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!("deleted image '{}'", path.display());
                report.deleted.push(path);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                report.missing.push(path);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to delete image '{}'", path.display()));
            }
        }
    }

    Ok(report)
}

/// Flag, delete and filter in one pass.
pub fn curate(
    config: &Config,
    store: &AnnotationStore,
    identifiers: Vec<String>,
) -> Result<Curation> {
    let validator = BoxValidator::new(&config.validation);
    let flagged = flag_too_small(&identifiers, store, &validator);
    let report = delete_images(config, &flagged)?;

    let flagged: HashSet<_> = flagged.iter().map(String::as_str).collect();
    let kept = identifiers
        .iter()
        .filter(|identifier| !flagged.contains(identifier.as_str()))
        .cloned()
        .collect();

    if !report.flagged.is_empty() {
        info!(
            "curation removed {} images, {} were already missing",
            report.deleted.len(),
            report.missing.len()
        );
    }

    Ok(Curation { kept, report })
}
