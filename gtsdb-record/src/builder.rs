//! Assembles one [ImageRecord] from an image file and its annotation rows.

use crate::{
    annotation::AnnotationStore,
    common::*,
    config::{Config, InvalidBoxPolicy, ShapeSource},
    record::{ImageRecord, ImageShape},
    validation::BoxValidator,
};

/// Builds image records. Cheap to clone and shared across shard workers.
#[derive(Debug, Clone)]
pub struct ImageAnnotationBuilder {
    config: Arc<Config>,
    store: Arc<AnnotationStore>,
    validator: BoxValidator,
}

impl ImageAnnotationBuilder {
    pub fn new(config: Arc<Config>, store: Arc<AnnotationStore>) -> Self {
        let validator = BoxValidator::new(&config.validation);
        Self {
            config,
            store,
            validator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The dimensions of `image`, either fixed or read from its header.
    /// `path` only names the image in errors.
    pub fn image_shape(&self, image: &[u8], path: &Path) -> Result<ImageShape> {
        match self.config.shape {
            ShapeSource::Fixed { height, width } => ImageShape::new(height, width),
            ShapeSource::Probe => {
                let imagesize::ImageSize { height, width } = imagesize::blob_size(image)
                    .with_context(|| {
                        format!("failed to read image size of '{}'", path.display())
                    })?;
                ImageShape::new(height, width)
            }
        }
    }

    pub fn build(&self, identifier: &str) -> Result<ImageRecord> {
        let path = self.config.image_path(identifier);
        let image = fs::read(&path)
            .with_context(|| format!("failed to read image file '{}'", path.display()))?;
        let shape = self.image_shape(&image, &path)?;
        let size = shape.size();
        let policy = self.config.validation.invalid_boxes;

        let mut record = ImageRecord::new(identifier, image, shape);

        for row in self.store.rows_for(identifier) {
            let rect = row.pixel_box();
            let verdict = self.validator.classify(&rect, &size);
            self.validator.report(row, &verdict);

            if verdict.is_invalid() && policy == InvalidBoxPolicy::Drop {
                warn!("drop box on line {} of '{}'", row.line_number, identifier);
                continue;
            }

            let bbox = rect.to_ratio(&size).ok_or_else(|| {
                format_err!("unable to normalize box on line {}", row.line_number)
            })?;
            record.push_object(bbox, row.class, &row.class_text);
        }

        debug_assert!(record.is_consistent());
        debug!(
            "{}: shape {}x{}x{}, boxes {:?}, labels {:?}",
            identifier,
            shape.height(),
            shape.width(),
            shape.channels(),
            record.boxes,
            record.labels
        );

        Ok(record)
    }
}
