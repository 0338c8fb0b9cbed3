use super::{Rect, HW};
use crate::common::*;

/// Bounding box in TLBR format.
///
/// The corners are stored as given. Use [Rect::is_ordered] to detect
/// inverted boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub t: T,
    pub l: T,
    pub b: T,
    pub r: T,
}

impl<T> TLBR<T> {
    /// Build a box from raw corners without checking their order.
    pub fn from_corners(t: T, l: T, b: T, r: T) -> Self {
        Self { t, l, b, r }
    }
}

impl<T> TLBR<T>
where
    T: Copy + ToPrimitive,
{
    /// Express the box in fractions of the image height and width.
    ///
    /// Vertical corners are divided by `size.h`, horizontal corners by `size.w`.
    /// Returns `None` if a value cannot be represented as `f64`.
    pub fn to_ratio<S>(&self, size: &HW<S>) -> Option<TLBR<f64>>
    where
        S: Copy + ToPrimitive,
    {
        let h = size.h.to_f64()?;
        let w = size.w.to_f64()?;
        Some(TLBR {
            t: self.t.to_f64()? / h,
            l: self.l.to_f64()? / w,
            b: self.b.to_f64()? / h,
            r: self.r.to_f64()? / w,
        })
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ratio_box() {
        let size = HW::try_from_hw([800usize, 1360]).unwrap();
        let rect = TLBR::from_corners(80i64, 136, 160, 272);
        let ratio = rect.to_ratio(&size).unwrap();
        assert_abs_diff_eq!(ratio.t, 0.1);
        assert_abs_diff_eq!(ratio.l, 0.1);
        assert_abs_diff_eq!(ratio.b, 0.2);
        assert_abs_diff_eq!(ratio.r, 0.2);
    }

    #[test]
    fn inverted_box() {
        let rect = TLBR::from_corners(50i64, 50, 10, 10);
        assert!(!rect.is_ordered());
        assert_eq!(rect.h(), -40);
        assert_eq!(rect.w(), -40);
        assert!(TLBR::from_corners(10i64, 10, 50, 50).is_ordered());
    }
}
