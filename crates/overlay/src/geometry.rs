// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of a source buffer or display, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Size { width, height }
    }

    /// The size with width and height exchanged.
    pub const fn transposed(self) -> Self {
        Size {
            width: self.height,
            height: self.width,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Rectangle covering the whole size, anchored at the origin.
    pub fn to_rect(self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

impl From<(i32, i32)> for Size {
    fn from((width, height): (i32, i32)) -> Self {
        Size::new(width, height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangle region in either source or display coordinates.
///
/// Which space a rectangle lives in is decided by its owner: crop rectangles
/// are in (rotation adjusted) source pixels, destination rectangles are in
/// display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// The left-most pixel offset for the rectangle
    pub x: i32,
    /// The top-most pixel offset for the rectangle
    pub y: i32,
    /// The width in pixels of the rectangle (end position is x+width)
    pub width: i32,
    /// The height in pixels of the rectangle (end position is y+height)
    pub height: i32,
}

impl Rect {
    /// Creates a new rectangle region.
    ///
    /// # Example
    ///
    /// ```
    /// use overlay::geometry::Rect;
    ///
    /// let rect = Rect::new(0, 0, 640, 480);
    /// assert_eq!(rect.right(), 640);
    /// assert_eq!(rect.bottom(), 480);
    /// ```
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge, saturating at the `i32` range.
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge, saturating at the `i32` range.
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// True when `self` lies entirely within `[0, bounds.width) x [0, bounds.height)`.
    pub fn fits_within(&self, bounds: Size) -> bool {
        !self.is_empty()
            && self.x >= 0
            && self.y >= 0
            && self.right() <= bounds.width
            && self.bottom() <= bounds.height
    }

    /// Intersection with the `bounds` area anchored at the origin. The result
    /// is empty when the rectangle lies completely outside.
    pub fn clamp_to(&self, bounds: Size) -> Rect {
        let x0 = self.x.clamp(0, bounds.width.max(0));
        let y0 = self.y.clamp(0, bounds.height.max(0));
        let x1 = self.right().clamp(x0, bounds.width.max(x0));
        let y1 = self.bottom().clamp(y0, bounds.height.max(y0));
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Limits width and height so that neither exceeds `factor` times the
    /// matching dimension of `reference`. The origin is kept.
    ///
    /// ```
    /// use overlay::geometry::{Rect, Size};
    ///
    /// let dst = Rect::new(0, 0, 2000, 2000).limit_scale(Size::new(100, 50), 8);
    /// assert_eq!(dst, Rect::new(0, 0, 800, 400));
    /// ```
    pub fn limit_scale(&self, reference: Size, factor: i32) -> Rect {
        Rect::new(
            self.x,
            self.y,
            self.width.min(reference.width.saturating_mul(factor)),
            self.height.min(reference.height.saturating_mul(factor)),
        )
    }

    /// Rounds every field down to an even value.
    pub fn align_even(&self) -> Rect {
        Rect::new(self.x & !1, self.y & !1, self.width & !1, self.height & !1)
    }

    /// Splits the rectangle into left and right halves. An odd width leaves
    /// the extra column on the right half.
    pub fn split_horizontal(&self) -> (Rect, Rect) {
        let half = self.width / 2;
        (
            Rect::new(self.x, self.y, half, self.height),
            Rect::new(self.x.saturating_add(half), self.y, self.width - half, self.height),
        )
    }

    /// Splits the rectangle into top and bottom halves.
    pub fn split_vertical(&self) -> (Rect, Rect) {
        let half = self.height / 2;
        (
            Rect::new(self.x, self.y, self.width, half),
            Rect::new(self.x, self.y.saturating_add(half), self.width, self.height - half),
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

impl From<(i32, i32, i32, i32)> for Rect {
    fn from((x, y, width, height): (i32, i32, i32, i32)) -> Self {
        Rect::new(x, y, width, height)
    }
}

impl From<Rect> for (i32, i32, i32, i32) {
    fn from(r: Rect) -> Self {
        (r.x, r.y, r.width, r.height)
    }
}

/// Largest rectangle with the aspect ratio of `content` that fits into
/// `bounds`, centered, with every field even.
///
/// ```
/// use overlay::geometry::{fit_aspect, Rect, Size};
///
/// // 4:3 content letterboxed on a 16:9 display
/// let r = fit_aspect(Size::new(640, 480), Size::new(1920, 1080));
/// assert_eq!(r, Rect::new(240, 0, 1440, 1080));
/// ```
pub fn fit_aspect(content: Size, bounds: Size) -> Rect {
    if content.is_empty() || bounds.is_empty() {
        return Rect::default();
    }
    let (cw, ch) = (content.width as i64, content.height as i64);
    let (bw, bh) = (bounds.width as i64, bounds.height as i64);
    let (w, h) = if cw * bh > ch * bw {
        (bw, ch * bw / cw)
    } else {
        (cw * bh / ch, bh)
    };
    let x = (bw - w) / 2;
    let y = (bh - h) / 2;
    Rect::new(x as i32, y as i32, w as i32, h as i32).align_even()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_bounds() {
        let bounds = Size::new(1280, 800);
        assert_eq!(
            Rect::new(-10, 700, 200, 200).clamp_to(bounds),
            Rect::new(0, 700, 190, 100)
        );
        assert_eq!(Rect::new(1300, 0, 10, 10).clamp_to(bounds).width, 0);
        assert_eq!(
            Rect::new(10, 10, 100, 100).clamp_to(bounds),
            Rect::new(10, 10, 100, 100)
        );
    }

    #[test]
    fn test_fits_within() {
        let bounds = Size::new(200, 100);
        assert!(Rect::new(0, 0, 200, 100).fits_within(bounds));
        assert!(!Rect::new(1, 0, 200, 100).fits_within(bounds));
        assert!(!Rect::new(0, 0, 0, 100).fits_within(bounds));
        assert!(!Rect::new(-1, 0, 10, 10).fits_within(bounds));
    }

    #[test]
    fn test_edges_saturate() {
        let bounds = Size::new(1280, 720);
        let far = Rect::new(i32::MAX - 10, 0, 100, 100);
        assert_eq!(far.right(), i32::MAX);
        assert!(!far.fits_within(bounds));
        assert!(far.clamp_to(bounds).is_empty());

        let wide = Rect::new(1, 0, i32::MAX, 10);
        assert!(!wide.fits_within(bounds));
        assert_eq!(wide.clamp_to(bounds), Rect::new(1, 0, 1279, 10));

        let (_, right) = Rect::new(i32::MAX - 1, 0, 100, 10).split_horizontal();
        assert_eq!(right.x, i32::MAX);
    }

    #[test]
    fn test_align_even() {
        assert_eq!(
            Rect::new(101, 51, 301, 151).align_even(),
            Rect::new(100, 50, 300, 150)
        );
    }

    #[test]
    fn test_splits() {
        let (l, r) = Rect::new(0, 0, 1280, 720).split_horizontal();
        assert_eq!(l, Rect::new(0, 0, 640, 720));
        assert_eq!(r, Rect::new(640, 0, 640, 720));
        let (t, b) = Rect::new(10, 0, 100, 9).split_vertical();
        assert_eq!(t, Rect::new(10, 0, 100, 4));
        assert_eq!(b, Rect::new(10, 4, 100, 5));
    }

    #[test]
    fn test_fit_aspect_pillarbox_and_letterbox() {
        assert_eq!(
            fit_aspect(Size::new(1920, 1080), Size::new(1280, 1024)),
            Rect::new(0, 152, 1280, 720)
        );
        assert_eq!(
            fit_aspect(Size::new(1280, 720), Size::new(1920, 1080)),
            Rect::new(0, 0, 1920, 1080)
        );
        assert!(fit_aspect(Size::new(0, 10), Size::new(10, 10)).is_empty());
    }
}
