//! Integer rectangles.

use std::{cmp, fmt};

use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};

/// An axis-aligned rectangle.
///
/// This rectangle type uses (signed) integer coordinates and is meant to be used with
/// [`crate::Image`]. The covered pixels are `x..x + width` and `y..y + height`, so
/// [`Rect::x_end`] and [`Rect::y_end`] are *exclusive*.
///
/// Rectangles are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub(crate) rect: Rectangle,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: i32, top_left_y: i32, width: u32, height: u32) -> Self {
        Self {
            rect: Rectangle {
                top_left: Point {
                    x: top_left_x,
                    y: top_left_y,
                },
                size: Size { width, height },
            },
        }
    }

    /// Creates a rectangle from two opposing corner points.
    ///
    /// Both corners are *inclusive*: `from_corners((0, 0), (0, 0))` covers a single pixel.
    pub fn from_corners(top_left: (i32, i32), bottom_right: (i32, i32)) -> Self {
        Self::span_inner(top_left.0, top_left.1, bottom_right.0, bottom_right.1)
    }

    /// Creates a rectangle spanning the half-open ranges `x_min..x_end` and `y_min..y_end`.
    ///
    /// # Panics
    ///
    /// Panics if `x_end < x_min` or `y_end < y_min`.
    pub fn from_bounds(x_min: i32, y_min: i32, x_end: i32, y_end: i32) -> Self {
        assert!(x_min <= x_end, "x_min={}, x_end={}", x_min, x_end);
        assert!(y_min <= y_end, "y_min={}, y_end={}", y_min, y_end);
        Self::from_top_left(
            x_min,
            y_min,
            (i64::from(x_end) - i64::from(x_min)) as u32,
            (i64::from(y_end) - i64::from(y_min)) as u32,
        )
    }

    /// Computes the (axis-aligned) bounding rectangle that encompasses `points`.
    ///
    /// The resulting rectangle contains every point, so its [`Rect::x_end`] is one past the
    /// largest X coordinate. Returns `None` if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = (i32, i32)>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let (x, y) = iter.next()?;
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (x, x, y, y);

        for (x, y) in iter {
            x_min = cmp::min(x_min, x);
            x_max = cmp::max(x_max, x);
            y_min = cmp::min(y_min, y);
            y_max = cmp::max(y_max, y);
        }

        Some(Self::span_inner(x_min, y_min, x_max, y_max))
    }

    fn span_inner(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        assert!(x_min <= x_max, "x_min={}, x_max={}", x_min, x_max);
        assert!(y_min <= y_max, "y_min={}, y_max={}", y_min, y_max);
        // Spanning all of `i32` needs one more pixel than `u32` can count.
        let extent = |min: i32, max: i32| {
            u32::try_from(i64::from(max) - i64::from(min) + 1).unwrap_or(u32::MAX)
        };
        Self::from_top_left(x_min, y_min, extent(x_min, x_max), extent(y_min, y_max))
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> i32 {
        self.rect.top_left.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> i32 {
        self.rect.top_left.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.rect.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.rect.size.height
    }

    /// Returns the X coordinate one past the right edge of the rectangle.
    #[inline]
    pub fn x_end(&self) -> i64 {
        i64::from(self.x()) + i64::from(self.width())
    }

    /// Returns the Y coordinate one past the bottom edge of the rectangle.
    #[inline]
    pub fn y_end(&self) -> i64 {
        i64::from(self.y()) + i64::from(self.height())
    }

    /// Returns whether this rectangle covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns `None` when the intersection is empty (ie. the rectangles do not overlap, or one of
    /// them has zero area).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x().max(other.x());
        let y_min = self.y().max(other.y());
        let x_end = self.x_end().min(other.x_end());
        let y_end = self.y_end().min(other.y_end());
        if i64::from(x_min) >= x_end || i64::from(y_min) >= y_end {
            return None;
        }
        let rect = Rect::from_bounds(x_min, y_min, x_end as i32, y_end as i32);
        debug_assert!(self.contains_rect(&rect) && other.contains_rect(&rect));
        Some(rect)
    }

    /// Returns whether `self` contains `other`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x() <= other.x()
            && self.y() <= other.y()
            && self.x_end() >= other.x_end()
            && self.y_end() >= other.y_end()
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = (self.x(), self.y());
        let (w, h) = (self.width(), self.height());
        let (bx, by) = (self.x_end(), self.y_end());
        write!(f, "Rect @ ({x},{y})-({bx},{by})/{w}x{h}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_rect() {
        let outer = Rect::from_top_left(-8, -8, 16, 16);
        assert!(outer.contains_rect(&outer));
        assert!(outer.contains_rect(&Rect::from_top_left(-7, -7, 15, 15)));
        assert!(!outer.contains_rect(&Rect::from_top_left(-7, -8, 16, 16)));
        assert!(!outer.contains_rect(&Rect::from_top_left(-8, -8, 16, 17)));
        assert!(!outer.contains_rect(&Rect::from_top_left(-9, -8, 10, 10)));
    }

    #[test]
    fn test_intersection() {
        let image = Rect::from_top_left(0, 0, 200, 200);
        assert_eq!(
            Rect::from_bounds(-60, 130, 80, 260).intersection(&image),
            Some(Rect::from_bounds(0, 130, 80, 200))
        );
        assert_eq!(
            Rect::from_corners((5, 5), (5, 5)).intersection(&image),
            Some(Rect::from_corners((5, 5), (5, 5)))
        );
        assert_eq!(Rect::from_bounds(-50, 0, 0, 10).intersection(&image), None);
        assert_eq!(Rect::from_top_left(10, 10, 0, 5).intersection(&image), None);
    }

    #[test]
    fn test_bounding() {
        assert_eq!(
            Rect::bounding([(0, 0), (1, 1), (-1, -1)]).unwrap(),
            Rect::from_corners((-1, -1), (1, 1)),
        );
        assert_eq!(
            Rect::bounding([(1, 1), (2, 2)]).unwrap(),
            Rect::from_bounds(1, 1, 3, 3),
        );
        assert_eq!(Rect::bounding([(4, 9)]).unwrap().width(), 1);
        assert_eq!(Rect::bounding(std::iter::empty::<(i32, i32)>()), None);
    }

    #[test]
    fn test_bounding_saturates() {
        let full = Rect::bounding([(i32::MIN, 0), (i32::MAX, 0)]).unwrap();
        assert_eq!(full.x(), i32::MIN);
        assert_eq!(full.width(), u32::MAX);
        assert_eq!(full.height(), 1);
        assert!(!full.is_empty());

        let image = Rect::from_top_left(0, 0, 200, 100);
        assert_eq!(
            full.intersection(&image),
            Some(Rect::from_top_left(0, 0, 200, 1))
        );
    }
}
