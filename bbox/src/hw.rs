use crate::common::*;

/// Image or box size in height-width order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HW<T> {
    pub h: T,
    pub w: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    /// Build a size, rejecting zero or negative extents.
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h > zero && w > zero,
            "height and width parameters must be positive"
        );
        Ok(Self { h, w })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_positive_size() {
        let size = HW::try_from_hw([800usize, 1360]).unwrap();
        assert_eq!((size.h, size.w), (800, 1360));
        assert!(HW::try_from_hw([0.5, 2.0]).is_ok());
    }

    #[test]
    fn reject_empty_size() {
        assert!(HW::try_from_hw([0usize, 1360]).is_err());
        assert!(HW::try_from_hw([800i64, -1]).is_err());
    }
}
