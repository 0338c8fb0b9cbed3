//! The flat ground truth file and per-image lookup.

use crate::{common::*, config::MatchPolicy};

/// One parsed line of the ground truth file.
///
/// A line carries six fields separated by `;`, `,` or whitespace:
/// `<image> <xmin> <ymin> <xmax> <ymax> <class>`, e.g. `00000.jpg;774;411;815;446;11`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRow {
    /// The raw line, kept for diagnostics.
    pub line: String,
    /// One-based line number in the source file.
    pub line_number: usize,
    /// The image field with its extension stripped.
    pub key: String,
    /// The numeric value of `key`, if it is a number.
    pub image_index: Option<u64>,
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
    pub class: u32,
    /// The class field as written in the file.
    pub class_text: String,
}

impl AnnotationRow {
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let fields: Vec<_> = line
            .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .collect();

        let (image, xmin, ymin, xmax, ymax, class) = match *fields.as_slice() {
            [image, xmin, ymin, xmax, ymax, class] => (image, xmin, ymin, xmax, ymax, class),
            _ => bail!(
                "line {}: expect 6 fields, but found {}: '{}'",
                line_number,
                fields.len(),
                line
            ),
        };

        // Coordinates are read as i32 and widened, so box extents never overflow.
        let parse_coord = |name: &str, text: &str| -> Result<i64> {
            let value: i32 = text.parse().with_context(|| {
                format!(
                    "line {}: invalid {} '{}': '{}'",
                    line_number, name, text, line
                )
            })?;
            Ok(value.into())
        };

        let key = Path::new(image)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(image)
            .to_owned();
        let image_index = key.parse().ok();

        Ok(Self {
            line: line.to_owned(),
            line_number,
            image_index,
            xmin: parse_coord("xmin", xmin)?,
            ymin: parse_coord("ymin", ymin)?,
            xmax: parse_coord("xmax", xmax)?,
            ymax: parse_coord("ymax", ymax)?,
            class: class.parse().with_context(|| {
                format!(
                    "line {}: invalid class label '{}': '{}'",
                    line_number, class, line
                )
            })?,
            class_text: class.to_owned(),
            key,
        })
    }

    /// The box in pixel units.
    pub fn pixel_box(&self) -> TLBR<i64> {
        TLBR::from_corners(self.ymin, self.xmin, self.ymax, self.xmax)
    }
}

/// All rows of the ground truth file, indexed by image.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    rows: Vec<AnnotationRow>,
    index: HashMap<String, Vec<usize>>,
    policy: MatchPolicy,
}

impl AnnotationStore {
    pub fn open(path: impl AsRef<Path>, policy: MatchPolicy) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            path.is_file(),
            "the ground truth file '{}' does not exist",
            path.display()
        );
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read ground truth file '{}'", path.display()))?;
        Self::from_text(&text, policy)
            .with_context(|| format!("failed to parse ground truth file '{}'", path.display()))
    }

    pub fn from_text(text: &str, policy: MatchPolicy) -> Result<Self> {
        let rows: Vec<_> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| AnnotationRow::parse(line.trim_end(), index + 1))
            .try_collect()?;

        let index = rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row.key.clone(), index))
            .into_group_map();

        Ok(Self {
            rows,
            index,
            policy,
        })
    }

    /// The rows belonging to `identifier`, in file order.
    ///
    /// An image without annotations yields no rows.
    pub fn rows_for(&self, identifier: &str) -> Vec<&AnnotationRow> {
        match self.policy {
            MatchPolicy::Exact => self
                .index
                .get(identifier)
                .map(|indexes| indexes.iter().map(|&index| &self.rows[index]).collect())
                .unwrap_or_default(),
            MatchPolicy::Prefix => self
                .rows
                .iter()
                .filter(|row| row.line.starts_with(identifier))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GT: &str = "\
img1.jpg;774;411;815;446;11
img10.jpg;983;388;1024;432;40
img1.jpg;386;494;442;552;38

img2.jpg;973;335;1031;390;13
";

    #[test]
    fn parse_gtsdb_line() {
        let row = AnnotationRow::parse("00042.jpg;774;411;815;446;11", 3).unwrap();
        assert_eq!(row.key, "00042");
        assert_eq!(row.image_index, Some(42));
        assert_eq!((row.xmin, row.ymin, row.xmax, row.ymax), (774, 411, 815, 446));
        assert_eq!(row.class, 11);
        assert_eq!(row.class_text, "11");
        assert_eq!(row.line_number, 3);
        assert_eq!(row.pixel_box(), TLBR::from_corners(411, 774, 446, 815));
    }

    #[test]
    fn parse_whitespace_and_negative_fields() {
        let row = AnnotationRow::parse("frame 0, -3 12 40   7", 1).unwrap();
        assert_eq!(row.key, "frame");
        assert_eq!(row.image_index, None);
        assert_eq!((row.xmin, row.ymin, row.xmax, row.ymax), (0, -3, 12, 40));
        assert_eq!(row.class, 7);
    }

    #[test]
    fn reject_malformed_lines() {
        assert!(AnnotationRow::parse("00000.jpg;774;411;815;446", 1).is_err());
        assert!(AnnotationRow::parse("00000.jpg;774;411;815;446;11;2", 1).is_err());
        assert!(AnnotationRow::parse("00000.jpg;774.5;411;815;446;11", 1).is_err());
        assert!(AnnotationRow::parse("00000.jpg;774;411;815;446;-1", 1).is_err());
        assert!(AnnotationStore::from_text("a;1;2;3;4;5\nbroken\n", MatchPolicy::Exact).is_err());
    }

    #[test]
    fn reject_coordinates_beyond_i32() {
        let line = "00000.jpg;-9223372036854775808;10;9223372036854775807;50;1";
        let err = AnnotationRow::parse(line, 4).unwrap_err();
        assert!(format!("{:#}", err).contains("line 4"));
        assert!(AnnotationRow::parse("00000.jpg;2147483648;10;20;50;1", 1).is_err());

        let row = AnnotationRow::parse("00000.jpg;-2147483648;10;2147483647;50;1", 1).unwrap();
        assert_eq!(row.pixel_box().r - row.pixel_box().l, u32::MAX as i64);
    }

    #[test]
    fn keep_raw_class_token() {
        let row = AnnotationRow::parse("00000.jpg;774;411;815;446;011", 1).unwrap();
        assert_eq!(row.class, 11);
        assert_eq!(row.class_text, "011");
    }

    #[test]
    fn exact_lookup() {
        let store = AnnotationStore::from_text(GT, MatchPolicy::Exact).unwrap();
        assert_eq!(store.len(), 4);

        let rows = store.rows_for("img1");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].class, 11);
        assert_eq!(rows[1].class, 38);
        assert_eq!(rows[1].line_number, 3);

        assert_eq!(store.rows_for("img10").len(), 1);
        assert!(store.rows_for("img3").is_empty());
    }

    #[test]
    fn prefix_lookup_claims_longer_identifiers() {
        let store = AnnotationStore::from_text(GT, MatchPolicy::Prefix).unwrap();
        let classes: Vec<_> = store.rows_for("img1").iter().map(|row| row.class).collect();
        assert_eq!(classes, vec![11, 40, 38]);
        assert_eq!(store.rows_for("img2").len(), 1);
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AnnotationStore::open(dir.path().join("gt.txt"), MatchPolicy::Exact);
        assert!(result.is_err());
    }
}
