//! The per-image record and its `Example` encoding.

use crate::common::*;

/// A bounding box in ratio units: `(ymin, xmin, ymax, xmax)` stored as `(t, l, b, r)`.
pub type NormalizedBox = TLBR<f64>;

const IMAGE_FORMAT: &[u8] = b"JPEG";

/// Image dimensions. Channels are always 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageShape {
    height: usize,
    width: usize,
}

impl ImageShape {
    pub const CHANNELS: usize = 3;

    /// The uniform GTSDB image dimensions.
    pub const GTSDB: Self = Self {
        height: 800,
        width: 1360,
    };

    pub fn new(height: usize, width: usize) -> Result<Self> {
        ensure!(
            height > 0 && width > 0,
            "image height and width must be positive, but get {}x{}",
            height,
            width
        );
        Ok(Self { height, width })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        Self::CHANNELS
    }

    pub fn size(&self) -> HW<usize> {
        HW {
            h: self.height,
            w: self.width,
        }
    }
}

/// One image with its annotations, as stored in a shard.
///
/// `boxes`, `labels`, `label_texts`, `difficult` and `truncated` are parallel
/// sequences of equal length. Use [ImageRecord::push_object] to extend them.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub identifier: String,
    /// Raw encoded image bytes.
    pub image: Vec<u8>,
    pub shape: ImageShape,
    pub boxes: Vec<NormalizedBox>,
    pub labels: Vec<i64>,
    pub label_texts: Vec<Vec<u8>>,
    pub difficult: Vec<bool>,
    pub truncated: Vec<bool>,
}

impl ImageRecord {
    /// Create a record without objects.
    pub fn new(identifier: impl Into<String>, image: Vec<u8>, shape: ImageShape) -> Self {
        Self {
            identifier: identifier.into(),
            image,
            shape,
            boxes: vec![],
            labels: vec![],
            label_texts: vec![],
            difficult: vec![],
            truncated: vec![],
        }
    }

    /// Append one object. `label_text` is the class token as written in the
    /// ground truth. The dataset has no difficult or truncated metadata.
    pub fn push_object(&mut self, bbox: NormalizedBox, class: u32, label_text: &str) {
        self.boxes.push(bbox);
        self.labels.push(class as i64);
        self.label_texts.push(label_text.as_bytes().to_vec());
        self.difficult.push(false);
        self.truncated.push(false);
    }

    pub fn num_objects(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_consistent(&self) -> bool {
        let len = self.boxes.len();
        self.labels.len() == len
            && self.label_texts.len() == len
            && self.difficult.len() == len
            && self.truncated.len() == len
    }

    pub fn to_example(&self) -> Example {
        let height = self.shape.height() as i64;
        let width = self.shape.width() as i64;
        let channels = self.shape.channels() as i64;

        let mut ymin = Vec::with_capacity(self.boxes.len());
        let mut xmin = Vec::with_capacity(self.boxes.len());
        let mut ymax = Vec::with_capacity(self.boxes.len());
        let mut xmax = Vec::with_capacity(self.boxes.len());
        self.boxes.iter().for_each(|bbox| {
            ymin.push(bbox.t as f32);
            xmin.push(bbox.l as f32);
            ymax.push(bbox.b as f32);
            xmax.push(bbox.r as f32);
        });

        let flags = |flags: &[bool]| -> Vec<i64> {
            flags.iter().map(|&flag| flag as i64).collect()
        };

        vec![
            ("image/height", Feature::from_i64_list(vec![height])),
            ("image/width", Feature::from_i64_list(vec![width])),
            ("image/channels", Feature::from_i64_list(vec![channels])),
            (
                "image/shape",
                Feature::from_i64_list(vec![height, width, channels]),
            ),
            ("image/object/bbox/xmin", Feature::from_f32_list(xmin)),
            ("image/object/bbox/xmax", Feature::from_f32_list(xmax)),
            ("image/object/bbox/ymin", Feature::from_f32_list(ymin)),
            ("image/object/bbox/ymax", Feature::from_f32_list(ymax)),
            (
                "image/object/bbox/label",
                Feature::from_i64_list(self.labels.as_slice()),
            ),
            (
                "image/object/bbox/label_text",
                Feature::from_bytes_list(self.label_texts.as_slice()),
            ),
            (
                "image/object/bbox/difficult",
                Feature::from_i64_list(flags(&self.difficult)),
            ),
            (
                "image/object/bbox/truncated",
                Feature::from_i64_list(flags(&self.truncated)),
            ),
            (
                "image/format",
                Feature::from_bytes_list(vec![IMAGE_FORMAT.to_vec()]),
            ),
            (
                "image/filename",
                Feature::from_bytes_list(vec![self.identifier.as_bytes().to_vec()]),
            ),
            (
                "image/encoded",
                Feature::from_bytes_list(vec![self.image.clone()]),
            ),
        ]
        .into_iter()
        .map(|(key, feature)| (key.to_owned(), feature))
        .collect()
    }

    pub fn from_example(example: &Example) -> Result<Self> {
        let example = example
            .features
            .as_ref()
            .map(|features| &features.feature)
            .ok_or_else(|| format_err!("the example has no features"))?;

        let height = *single(int64_list(example, "image/height")?, "image/height")?;
        let width = *single(int64_list(example, "image/width")?, "image/width")?;
        let channels = *single(int64_list(example, "image/channels")?, "image/channels")?;
        ensure!(
            channels == ImageShape::CHANNELS as i64,
            "expect {} channels, but found {}",
            ImageShape::CHANNELS,
            channels
        );
        ensure!(
            height > 0 && width > 0,
            "image height and width must be positive"
        );
        let shape = ImageShape::new(height as usize, width as usize)?;

        let identifier = {
            let bytes = single(bytes_list(example, "image/filename")?, "image/filename")?;
            String::from_utf8(bytes.clone()).context("image/filename is not valid UTF-8")?
        };
        let image = single(bytes_list(example, "image/encoded")?, "image/encoded")?.clone();

        let xmin = float_list(example, "image/object/bbox/xmin")?;
        let xmax = float_list(example, "image/object/bbox/xmax")?;
        let ymin = float_list(example, "image/object/bbox/ymin")?;
        let ymax = float_list(example, "image/object/bbox/ymax")?;
        let labels = int64_list(example, "image/object/bbox/label")?;
        let label_texts = bytes_list(example, "image/object/bbox/label_text")?;
        let difficult = int64_list(example, "image/object/bbox/difficult")?;
        let truncated = int64_list(example, "image/object/bbox/truncated")?;

        let len = xmin.len();
        ensure!(
            [
                xmax.len(),
                ymin.len(),
                ymax.len(),
                labels.len(),
                label_texts.len(),
                difficult.len(),
                truncated.len(),
            ]
            .iter()
            .all(|&other| other == len),
            "object features of '{}' have mismatched lengths",
            identifier
        );

        let boxes = itertools::izip!(ymin, xmin, ymax, xmax)
            .map(|(&t, &l, &b, &r)| TLBR::from_corners(t as f64, l as f64, b as f64, r as f64))
            .collect();

        Ok(Self {
            identifier,
            image,
            shape,
            boxes,
            labels: labels.to_vec(),
            label_texts: label_texts.to_vec(),
            difficult: difficult.iter().map(|&flag| flag != 0).collect(),
            truncated: truncated.iter().map(|&flag| flag != 0).collect(),
        })
    }
}

fn single<'a, T>(values: &'a [T], key: &str) -> Result<&'a T> {
    match values {
        [value] => Ok(value),
        _ => bail!("expect one value for '{}', but found {}", key, values.len()),
    }
}

type FeatureMap = HashMap<String, Feature>;

fn feature<'a>(example: &'a FeatureMap, key: &str) -> Result<&'a Feature> {
    example
        .get(key)
        .ok_or_else(|| format_err!("the feature '{}' is missing", key))
}

// A feature without a kind is an empty list of any type.
fn int64_list<'a>(example: &'a FeatureMap, key: &str) -> Result<&'a [i64]> {
    let feature = feature(example, key)?;
    match feature.as_i64_list() {
        Some(values) => Ok(values),
        None if feature.kind.is_none() => Ok(&[]),
        None => bail!("the feature '{}' is not an int64 list", key),
    }
}

fn float_list<'a>(example: &'a FeatureMap, key: &str) -> Result<&'a [f32]> {
    let feature = feature(example, key)?;
    match feature.as_f32_list() {
        Some(values) => Ok(values),
        None if feature.kind.is_none() => Ok(&[]),
        None => bail!("the feature '{}' is not a float list", key),
    }
}

fn bytes_list<'a>(example: &'a FeatureMap, key: &str) -> Result<&'a [Vec<u8>]> {
    let feature = feature(example, key)?;
    match feature.as_bytes_list() {
        Some(values) => Ok(values),
        None if feature.kind.is_none() => Ok(&[]),
        None => bail!("the feature '{}' is not a bytes list", key),
    }
}
