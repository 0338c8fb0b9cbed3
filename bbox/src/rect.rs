use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;

    fn h(&self) -> Self::Type
    where
        Self::Type: Num,
    {
        self.b() - self.t()
    }

    fn w(&self) -> Self::Type
    where
        Self::Type: Num,
    {
        self.r() - self.l()
    }

    /// Whether bottom lies below top and right lies right of left.
    fn is_ordered(&self) -> bool
    where
        Self::Type: PartialOrd,
    {
        self.b() >= self.t() && self.r() >= self.l()
    }
}
