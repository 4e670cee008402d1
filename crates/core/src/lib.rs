//! Core display primitives shared by the emulation side and the presentation side.

pub mod graphics;
pub mod logging;
pub mod palette;
pub mod renderer;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// Width/height pair in pixels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Size {
        pub width: u32,
        pub height: u32,
    }

    impl Size {
        pub const ZERO: Size = Size {
            width: 0,
            height: 0,
        };

        pub fn new(width: u32, height: u32) -> Self {
            Self { width, height }
        }

        /// A size is empty when either dimension is zero.
        pub fn is_empty(&self) -> bool {
            self.width == 0 || self.height == 0
        }

        pub fn area(&self) -> usize {
            self.width as usize * self.height as usize
        }
    }

    /// Axis-aligned pixel rectangle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Rect {
        pub x: u32,
        pub y: u32,
        pub w: u32,
        pub h: u32,
    }

    impl Rect {
        pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
            Self { x, y, w, h }
        }

        /// Exclusive right edge, saturating instead of wrapping.
        pub fn right(&self) -> u32 {
            self.x.saturating_add(self.w)
        }

        /// Exclusive bottom edge, saturating instead of wrapping.
        pub fn bottom(&self) -> u32 {
            self.y.saturating_add(self.h)
        }

        pub fn is_empty(&self) -> bool {
            self.w == 0 || self.h == 0
        }

        /// Bounding box of `self` and `other`.
        pub fn union(&self, other: &Rect) -> Rect {
            let x = self.x.min(other.x);
            let y = self.y.min(other.y);
            let right = self.right().max(other.right());
            let bottom = self.bottom().max(other.bottom());
            Rect::new(x, y, right - x, bottom - y)
        }

        /// True if the rectangle lies entirely inside a surface of `size`.
        ///
        /// Uses checked arithmetic so an overflowing `x + w` is rejected
        /// rather than wrapped into range.
        pub fn fits_within(&self, size: Size) -> bool {
            match (self.x.checked_add(self.w), self.y.checked_add(self.h)) {
                (Some(right), Some(bottom)) => right <= size.width && bottom <= size.height,
                _ => false,
            }
        }

        pub fn area(&self) -> usize {
            self.w as usize * self.h as usize
        }
    }
}

pub use types::{Rect, Size};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_emptiness() {
        assert!(Size::ZERO.is_empty());
        assert!(Size::new(320, 0).is_empty());
        assert!(!Size::new(320, 200).is_empty());
        assert_eq!(Size::new(320, 200).area(), 64_000);
    }

    #[test]
    fn test_rect_union_is_bounding_box() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 5, 5);
        assert_eq!(a.union(&b), Rect::new(0, 0, 25, 25));
        assert_eq!(b.union(&a), Rect::new(0, 0, 25, 25));
    }

    #[test]
    fn test_rect_union_with_contained_rect_is_identity() {
        let outer = Rect::new(2, 3, 50, 40);
        let inner = Rect::new(10, 10, 4, 4);
        assert_eq!(outer.union(&inner), outer);
    }

    #[test]
    fn test_rect_fits_within_checks_edges() {
        let size = Size::new(320, 200);
        assert!(Rect::new(0, 0, 320, 200).fits_within(size));
        assert!(Rect::new(310, 190, 10, 10).fits_within(size));
        assert!(!Rect::new(311, 0, 10, 1).fits_within(size));
        assert!(!Rect::new(0, 191, 1, 10).fits_within(size));
    }

    #[test]
    fn test_rect_fits_within_rejects_overflow() {
        let size = Size::new(u32::MAX, u32::MAX);
        assert!(!Rect::new(u32::MAX, 0, 2, 1).fits_within(size));
    }
}
