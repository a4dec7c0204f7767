// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! The eight canonical orientation transforms and their composition.
//!
//! A display pipe or rotator accepts exactly one transform per submission,
//! encoded in three bits: horizontal flip (1), vertical flip (2) and a 90°
//! clockwise rotation (4) applied after the flips. The eight combinations
//! form the symmetry group of the rectangle, so any sequence of requests
//! collapses to a single value.
//!
//! Composition is a table lookup. The table is computed at compile time
//! from the 2x2 integer matrix of each transform acting on pixel
//! coordinates centered on the image (y pointing down).
//!
//! ```
//! use overlay::transform::Transform;
//!
//! assert_eq!(Transform::Rot90.then(Transform::Rot90), Transform::Rot180);
//! assert_eq!(Transform::FlipH.then(Transform::FlipV), Transform::Rot180);
//! assert_eq!(Transform::Rot90.inverse(), Transform::Rot270);
//! ```

use crate::geometry::{Rect, Size};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the eight canonical transforms, valued by its driver encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Transform {
    #[default]
    Identity = 0,
    FlipH = 1,
    FlipV = 2,
    Rot180 = 3,
    Rot90 = 4,
    Rot90FlipH = 5,
    Rot90FlipV = 6,
    Rot270 = 7,
}

type Matrix = [[i8; 2]; 2];

const FLIP_H: Matrix = [[-1, 0], [0, 1]];
const FLIP_V: Matrix = [[1, 0], [0, -1]];
const ROT_90: Matrix = [[0, -1], [1, 0]];
const IDENTITY: Matrix = [[1, 0], [0, 1]];

const fn mul(a: Matrix, b: Matrix) -> Matrix {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

const fn eq(a: Matrix, b: Matrix) -> bool {
    a[0][0] == b[0][0] && a[0][1] == b[0][1] && a[1][0] == b[1][0] && a[1][1] == b[1][1]
}

const fn matrix_of(bits: u8) -> Matrix {
    let mut m = IDENTITY;
    if bits & 1 != 0 {
        m = mul(FLIP_H, m);
    }
    if bits & 2 != 0 {
        m = mul(FLIP_V, m);
    }
    if bits & 4 != 0 {
        m = mul(ROT_90, m);
    }
    m
}

const MATRICES: [Matrix; 8] = {
    let mut out = [IDENTITY; 8];
    let mut i = 0;
    while i < 8 {
        out[i] = matrix_of(i as u8);
        i += 1;
    }
    out
};

/// `COMPOSE[a][b]` is the single transform equal to applying `a` then `b`.
const COMPOSE: [[u8; 8]; 8] = {
    let mut table = [[0u8; 8]; 8];
    let mut a = 0;
    while a < 8 {
        let mut b = 0;
        while b < 8 {
            let product = mul(MATRICES[b], MATRICES[a]);
            let mut c = 0;
            while c < 8 {
                if eq(MATRICES[c], product) {
                    table[a][b] = c as u8;
                }
                c += 1;
            }
            b += 1;
        }
        a += 1;
    }
    table
};

impl Transform {
    pub const ALL: [Transform; 8] = [
        Transform::Identity,
        Transform::FlipH,
        Transform::FlipV,
        Transform::Rot180,
        Transform::Rot90,
        Transform::Rot90FlipH,
        Transform::Rot90FlipV,
        Transform::Rot270,
    ];

    /// Decodes the three-bit driver value. Higher bits are rejected.
    pub fn from_bits(bits: u32) -> Option<Transform> {
        Self::ALL.get(usize::try_from(bits).ok()?).copied()
    }

    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// True when the transform exchanges width and height.
    pub const fn swaps_axes(self) -> bool {
        (self as u8) & 4 != 0
    }

    pub const fn is_identity(self) -> bool {
        matches!(self, Transform::Identity)
    }

    /// Applies `self` first and `next` second.
    pub fn then(self, next: Transform) -> Transform {
        Self::ALL[COMPOSE[self as usize][next as usize] as usize]
    }

    pub fn inverse(self) -> Transform {
        Self::ALL
            .into_iter()
            .find(|t| self.then(*t).is_identity())
            .unwrap_or_default()
    }

    /// Size of an image of `size` after this transform.
    pub const fn apply_to_size(self, size: Size) -> Size {
        if self.swaps_axes() {
            size.transposed()
        } else {
            size
        }
    }

    /// Maps `rect`, expressed in an image of `size`, into the transformed
    /// image. 90°/270° exchange width and height and remap the origin
    /// against the untransformed size; flips mirror the origin only.
    ///
    /// ```
    /// use overlay::geometry::{Rect, Size};
    /// use overlay::transform::Transform;
    ///
    /// let src = Size::new(200, 100);
    /// let crop = Rect::new(10, 20, 50, 30);
    /// assert_eq!(Transform::Rot90.apply_to_rect(crop, src), Rect::new(50, 10, 30, 50));
    /// assert_eq!(Transform::Rot180.apply_to_rect(crop, src), Rect::new(140, 50, 50, 30));
    /// ```
    pub fn apply_to_rect(self, rect: Rect, size: Size) -> Rect {
        let out = self.apply_to_size(size);
        let m = MATRICES[self as usize];
        // doubled coordinates keep half-pixel centers integral
        let map = |x: i32, y: i32| -> (i32, i32) {
            let (cx, cy) = (2 * x - size.width, 2 * y - size.height);
            let tx = m[0][0] as i32 * cx + m[0][1] as i32 * cy + out.width;
            let ty = m[1][0] as i32 * cx + m[1][1] as i32 * cy + out.height;
            (tx / 2, ty / 2)
        };
        let (ax, ay) = map(rect.x, rect.y);
        let (bx, by) = map(rect.right(), rect.bottom());
        Rect::new(
            ax.min(bx),
            ay.min(by),
            (ax - bx).abs(),
            (ay - by).abs(),
        )
    }

    fn name(self) -> &'static str {
        match self {
            Transform::Identity => "identity",
            Transform::FlipH => "flip-h",
            Transform::FlipV => "flip-v",
            Transform::Rot180 => "180",
            Transform::Rot90 => "90",
            Transform::Rot90FlipH => "90+flip-h",
            Transform::Rot90FlipV => "90+flip-v",
            Transform::Rot270 => "270",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let alias = match lower.as_str() {
            "0" | "none" => "identity",
            "rot90" => "90",
            "rot180" => "180",
            "rot270" => "270",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|t| t.name() == alias)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown transform: {}", s)))
    }
}

/// Outcome of [`recompose`]: the transform and crop to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recomposed {
    pub transform: Transform,
    pub crop: Rect,
}

/// Moves a committed crop from the `committed` orientation to the absolute
/// `requested` orientation.
///
/// `crop` is expressed in the image already transformed by `committed`;
/// `source` is the untransformed source size. Only the corrective transform
/// `committed⁻¹` then `requested` is applied to the crop, so the result is
/// identical to transforming the untransformed crop by `requested` directly.
///
/// ```
/// use overlay::geometry::{Rect, Size};
/// use overlay::transform::{recompose, Transform};
///
/// let src = Size::new(200, 100);
/// let r90 = recompose(Transform::Identity, src.to_rect(), src, Transform::Rot90);
/// assert_eq!(r90.crop, Rect::new(0, 0, 100, 200));
/// let r270 = recompose(r90.transform, r90.crop, src, Transform::Rot270);
/// assert_eq!(r270.transform, Transform::Rot270);
/// assert_eq!(r270.crop, Rect::new(0, 0, 100, 200));
/// ```
pub fn recompose(
    committed: Transform,
    crop: Rect,
    source: Size,
    requested: Transform,
) -> Recomposed {
    let delta = committed.inverse().then(requested);
    let crop = delta.apply_to_rect(crop, committed.apply_to_size(source));
    log::debug!(
        "recompose {} -> {} via {}: crop {}",
        committed,
        requested,
        delta,
        crop
    );
    Recomposed {
        transform: requested,
        crop,
    }
}
