//! Per-box geometric sanity checks.

use crate::{annotation::AnnotationRow, common::*, config::ValidationConfig};

/// A problem found on a pixel box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxIssue {
    /// The box touches or crosses the image border.
    OutOfBounds,
    /// The box is narrower or shorter than the minimum size.
    TooSmall,
    /// The box has its corners swapped.
    Malformed,
}

impl Display for BoxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OutOfBounds => "out of bound",
            Self::TooSmall => "too small",
            Self::Malformed => "wrong annotations",
        };
        f.write_str(text)
    }
}

/// The outcome of all checks on one box. Checks are independent, so a box
/// may carry several issues at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoxVerdict {
    pub out_of_bounds: bool,
    pub too_small: bool,
    pub malformed: bool,
}

impl BoxVerdict {
    pub fn is_valid(&self) -> bool {
        !(self.out_of_bounds || self.too_small || self.malformed)
    }

    /// Whether the box carries wrong coordinates, as opposed to being merely small.
    pub fn is_invalid(&self) -> bool {
        self.out_of_bounds || self.malformed
    }

    pub fn issues(&self) -> impl Iterator<Item = BoxIssue> {
        [
            (self.out_of_bounds, BoxIssue::OutOfBounds),
            (self.too_small, BoxIssue::TooSmall),
            (self.malformed, BoxIssue::Malformed),
        ]
        .into_iter()
        .filter_map(|(flag, issue)| flag.then(|| issue))
    }
}

/// Classifies pixel boxes against the image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxValidator {
    border_margin: i64,
    min_box_size: i64,
}

impl Default for BoxValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl BoxValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            border_margin: config.border_margin,
            min_box_size: config.min_box_size,
        }
    }

    pub fn classify(&self, rect: &TLBR<i64>, size: &HW<usize>) -> BoxVerdict {
        BoxVerdict {
            out_of_bounds: self.is_out_of_bounds(rect, size),
            too_small: self.is_too_small(rect),
            malformed: !rect.is_ordered(),
        }
    }

    pub fn is_out_of_bounds(&self, rect: &TLBR<i64>, size: &HW<usize>) -> bool {
        let margin = self.border_margin;
        let height = size.h as i64;
        let width = size.w as i64;

        rect.l() <= margin
            || rect.t() <= margin
            || rect.r() >= width - margin
            || rect.b() >= height - margin
    }

    /// Independent of the image size, so curation can run without opening images.
    pub fn is_too_small(&self, rect: &TLBR<i64>) -> bool {
        rect.w() < self.min_box_size || rect.h() < self.min_box_size
    }

    /// Log one warning per issue with the offending line.
    pub fn report(&self, row: &AnnotationRow, verdict: &BoxVerdict) {
        verdict
            .issues()
            .for_each(|issue| warn!("{} {}", issue, row.line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gtsdb_size() -> HW<usize> {
        HW::try_from_hw([800, 1360]).unwrap()
    }

    fn pixel_box(xmin: i64, ymin: i64, xmax: i64, ymax: i64) -> TLBR<i64> {
        TLBR::from_corners(ymin, xmin, ymax, xmax)
    }

    #[test]
    fn classify_boxes() {
        let validator = BoxValidator::default();
        let size = gtsdb_size();

        let verdict = validator.classify(&pixel_box(0, 5, 50, 50), &size);
        assert_eq!(
            verdict,
            BoxVerdict {
                out_of_bounds: true,
                ..Default::default()
            }
        );

        let verdict = validator.classify(&pixel_box(10, 10, 25, 40), &size);
        assert_eq!(
            verdict,
            BoxVerdict {
                too_small: true,
                ..Default::default()
            }
        );

        let verdict = validator.classify(&pixel_box(50, 50, 10, 10), &size);
        assert!(verdict.malformed);
        assert!(verdict.is_invalid());
        assert!(!verdict.out_of_bounds);

        let verdict = validator.classify(&pixel_box(100, 100, 200, 200), &size);
        assert!(verdict.is_valid());
        assert_eq!(verdict.issues().count(), 0);
    }

    #[test]
    fn border_limits() {
        let validator = BoxValidator::default();
        let size = gtsdb_size();

        assert!(!validator.is_out_of_bounds(&pixel_box(2, 2, 1358, 798), &size));
        assert!(validator.is_out_of_bounds(&pixel_box(2, 1, 100, 100), &size));
        assert!(validator.is_out_of_bounds(&pixel_box(2, 2, 1359, 100), &size));
        assert!(validator.is_out_of_bounds(&pixel_box(2, 2, 100, 799), &size));
    }

    #[test]
    fn size_limits() {
        let validator = BoxValidator::default();
        assert!(!validator.is_too_small(&pixel_box(100, 100, 120, 120)));
        assert!(validator.is_too_small(&pixel_box(100, 100, 120, 119)));
    }

    #[test]
    fn extreme_coordinates_are_classified() {
        let validator = BoxValidator::default();
        let row = AnnotationRow::parse("00000.jpg;-2147483648;10;2147483647;50;1", 1).unwrap();
        let verdict = validator.classify(&row.pixel_box(), &gtsdb_size());
        assert!(verdict.out_of_bounds);
        assert!(verdict.too_small);
        assert!(!verdict.malformed);

        let row = AnnotationRow::parse("00000.jpg;2147483647;10;-2147483648;50;1", 1).unwrap();
        let verdict = validator.classify(&row.pixel_box(), &gtsdb_size());
        assert!(verdict.malformed);
        assert!(verdict.too_small);
    }

    #[test]
    fn issues_in_check_order() {
        let verdict = BoxVerdict {
            out_of_bounds: true,
            too_small: true,
            malformed: true,
        };
        let issues: Vec<_> = verdict.issues().collect();
        assert_eq!(
            issues,
            vec![BoxIssue::OutOfBounds, BoxIssue::TooSmall, BoxIssue::Malformed]
        );
        assert_eq!(BoxIssue::Malformed.to_string(), "wrong annotations");
    }
}
