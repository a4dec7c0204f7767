// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Stereoscopic layouts and the per-channel geometry split.
//!
//! A stereo source packs both eyes into one buffer (the *input* layout); a
//! stereo display expects them arranged in a given way across the panel
//! (the *output* layout). Each overlay channel scans out one eye, so the
//! layout engine extracts the eye's sub-rectangle from the crop and places
//! it into its share of the destination.
//!
//! | Input | Channel 0 | Channel 1 |
//! |-------|-----------|-----------|
//! | side-by-side L/R | left half | right half |
//! | side-by-side R/L | right half | left half |
//! | top-bottom | top half | bottom half |
//!
//! Channel 0 always carries the left eye and channel 1 the right eye. A
//! monoscopic output only instantiates channel 1, which then carries the
//! left eye on the full destination.

use crate::geometry::Rect;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arrangement of the two eyes inside a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputLayout {
    #[default]
    None,
    SideBySideLR,
    SideBySideRL,
    TopBottom,
    Interleaved,
}

/// Arrangement of the two eyes across the physical display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputLayout {
    #[default]
    None,
    SideBySide,
    TopBottom,
    Interleaved,
    Monoscopic,
}

const IN_SIDE_BY_SIDE_LR: u32 = 0x1_0000;
const IN_TOP_BOTTOM: u32 = 0x2_0000;
const IN_INTERLEAVED: u32 = 0x4_0000;
const IN_SIDE_BY_SIDE_RL: u32 = 0x8_0000;
const IN_MASK: u32 = 0xF_0000;

const OUT_SIDE_BY_SIDE: u32 = 0x1000;
const OUT_TOP_BOTTOM: u32 = 0x2000;
const OUT_INTERLEAVED: u32 = 0x4000;
const OUT_MONOSCOPIC: u32 = 0x8000;
const OUT_MASK: u32 = 0xF000;

impl InputLayout {
    pub fn is_stereo(self) -> bool {
        self != InputLayout::None
    }

    fn bits(self) -> u32 {
        match self {
            InputLayout::None => 0,
            InputLayout::SideBySideLR => IN_SIDE_BY_SIDE_LR,
            InputLayout::SideBySideRL => IN_SIDE_BY_SIDE_RL,
            InputLayout::TopBottom => IN_TOP_BOTTOM,
            InputLayout::Interleaved => IN_INTERLEAVED,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits & IN_MASK {
            0 => Some(InputLayout::None),
            IN_SIDE_BY_SIDE_LR => Some(InputLayout::SideBySideLR),
            IN_SIDE_BY_SIDE_RL => Some(InputLayout::SideBySideRL),
            IN_TOP_BOTTOM => Some(InputLayout::TopBottom),
            IN_INTERLEAVED => Some(InputLayout::Interleaved),
            _ => None,
        }
    }

    /// The output layout a stereo display uses for this input when the
    /// caller does not name one.
    pub fn default_output(self) -> OutputLayout {
        match self {
            InputLayout::None => OutputLayout::None,
            InputLayout::SideBySideLR | InputLayout::SideBySideRL => OutputLayout::SideBySide,
            InputLayout::TopBottom => OutputLayout::TopBottom,
            InputLayout::Interleaved => OutputLayout::Interleaved,
        }
    }
}

impl OutputLayout {
    /// True when two eyes reach the display.
    pub fn is_stereo(self) -> bool {
        matches!(
            self,
            OutputLayout::SideBySide | OutputLayout::TopBottom | OutputLayout::Interleaved
        )
    }

    fn bits(self) -> u32 {
        match self {
            OutputLayout::None => 0,
            OutputLayout::SideBySide => OUT_SIDE_BY_SIDE,
            OutputLayout::TopBottom => OUT_TOP_BOTTOM,
            OutputLayout::Interleaved => OUT_INTERLEAVED,
            OutputLayout::Monoscopic => OUT_MONOSCOPIC,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits & OUT_MASK {
            0 => Some(OutputLayout::None),
            OUT_SIDE_BY_SIDE => Some(OutputLayout::SideBySide),
            OUT_TOP_BOTTOM => Some(OutputLayout::TopBottom),
            OUT_INTERLEAVED => Some(OutputLayout::Interleaved),
            OUT_MONOSCOPIC => Some(OutputLayout::Monoscopic),
            _ => None,
        }
    }

    /// Input layout assumed for a source that only names its output.
    pub fn default_input(self) -> InputLayout {
        match self {
            OutputLayout::None | OutputLayout::Monoscopic => InputLayout::None,
            OutputLayout::SideBySide => InputLayout::SideBySideLR,
            OutputLayout::TopBottom => InputLayout::TopBottom,
            OutputLayout::Interleaved => InputLayout::Interleaved,
        }
    }

    /// Value announced to an external display: the output nibble.
    pub fn announce_bits(self) -> u32 {
        self.bits() >> 12
    }
}

/// Input/output layout pair of a video source.
///
/// Construction applies the fallback rules: an unset output follows the
/// input and an unset input follows the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Format3D {
    input: InputLayout,
    output: OutputLayout,
}

impl Format3D {
    pub const NONE: Format3D = Format3D {
        input: InputLayout::None,
        output: OutputLayout::None,
    };

    pub fn new(input: InputLayout, output: OutputLayout) -> Self {
        let (input, output) = match (input, output) {
            (InputLayout::None, output) => (output.default_input(), output),
            (input, OutputLayout::None) => (input, input.default_output()),
            pair => pair,
        };
        Format3D { input, output }
    }

    /// Decodes the packed representation.
    ///
    /// ```
    /// use overlay::stereo::{Format3D, InputLayout, OutputLayout};
    ///
    /// let f = Format3D::from_bits(0x2_0000)?;
    /// assert_eq!(f.input(), InputLayout::TopBottom);
    /// assert_eq!(f.output(), OutputLayout::TopBottom);
    /// assert_eq!(Format3D::from_bits(0x1_8000)?.output(), OutputLayout::Monoscopic);
    /// # Ok::<(), overlay::Error>(())
    /// ```
    pub fn from_bits(bits: u32) -> Result<Self, Error> {
        let input = InputLayout::from_bits(bits).ok_or_else(|| {
            Error::InvalidArgument(format!("ambiguous 3D input layout: 0x{:x}", bits))
        })?;
        let output = OutputLayout::from_bits(bits).ok_or_else(|| {
            Error::InvalidArgument(format!("ambiguous 3D output layout: 0x{:x}", bits))
        })?;
        Ok(Format3D::new(input, output))
    }

    pub fn bits(self) -> u32 {
        self.input.bits() | self.output.bits()
    }

    pub fn input(self) -> InputLayout {
        self.input
    }

    pub fn output(self) -> OutputLayout {
        self.output
    }

    /// True when the source buffer carries two eyes.
    pub fn has_stereo_content(self) -> bool {
        self.input.is_stereo()
    }
}

impl fmt::Display for Format3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}->{:?}", self.input, self.output)
    }
}

/// Which eye a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    fn of_channel(channel: usize) -> Eye {
        if channel == 0 {
            Eye::Left
        } else {
            Eye::Right
        }
    }
}

/// Source and destination rectangles of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelGeometry {
    /// Sub-rectangle of the source crop, in source coordinates
    pub source: Rect,
    /// Sub-rectangle of the destination, in display coordinates
    pub dest: Rect,
    /// Eye carried, `None` for 2D content
    pub eye: Option<Eye>,
}

/// Computes the geometry of `channel` (0 or 1) for a source laid out as
/// `input` shown with `output`.
///
/// `crop` is the full crop of the combined source frame and `dest` the full
/// destination the pair of eyes occupies. Interleaved layouts on either side
/// are rejected with [`Error::UnsupportedLayout`].
///
/// ```
/// use overlay::geometry::Rect;
/// use overlay::stereo::{split, InputLayout, OutputLayout};
///
/// let crop = Rect::new(0, 0, 1280, 720);
/// let dest = Rect::new(0, 0, 1920, 1080);
/// let right = split(InputLayout::TopBottom, OutputLayout::SideBySide, crop, dest, 1)?;
/// assert_eq!(right.source, Rect::new(0, 360, 1280, 360));
/// assert_eq!(right.dest, Rect::new(960, 0, 960, 1080));
/// # Ok::<(), overlay::Error>(())
/// ```
pub fn split(
    input: InputLayout,
    output: OutputLayout,
    crop: Rect,
    dest: Rect,
    channel: usize,
) -> Result<ChannelGeometry, Error> {
    if channel > 1 {
        return Err(Error::InvalidArgument(format!(
            "channel index {} out of range",
            channel
        )));
    }

    let eye = if output == OutputLayout::Monoscopic {
        Eye::Left
    } else {
        Eye::of_channel(channel)
    };

    let source = match input {
        InputLayout::None => crop,
        InputLayout::SideBySideLR | InputLayout::SideBySideRL => {
            let (left, right) = crop.split_horizontal();
            match (input == InputLayout::SideBySideLR, eye) {
                (true, Eye::Left) | (false, Eye::Right) => left,
                _ => right,
            }
        }
        InputLayout::TopBottom => {
            let (top, bottom) = crop.split_vertical();
            match eye {
                Eye::Left => top,
                Eye::Right => bottom,
            }
        }
        InputLayout::Interleaved => {
            return Err(Error::UnsupportedLayout(
                "interleaved stereo input".to_string(),
            ))
        }
    };

    let dest = match output {
        OutputLayout::None | OutputLayout::Monoscopic => dest,
        OutputLayout::SideBySide => {
            let (left, right) = dest.split_horizontal();
            if channel == 0 {
                left
            } else {
                right
            }
        }
        OutputLayout::TopBottom => {
            let (top, bottom) = dest.split_vertical();
            if channel == 0 {
                top
            } else {
                bottom
            }
        }
        OutputLayout::Interleaved => {
            return Err(Error::UnsupportedLayout(
                "interleaved stereo output".to_string(),
            ))
        }
    };

    let eye = input.is_stereo().then_some(eye);
    log::trace!(
        "split {:?}->{:?} channel {}: source {} dest {} eye {:?}",
        input,
        output,
        channel,
        source,
        dest,
        eye
    );
    Ok(ChannelGeometry { source, dest, eye })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CROP: Rect = Rect::new(0, 0, 1280, 720);
    const DEST: Rect = Rect::new(0, 0, 1920, 1080);

    #[test]
    fn test_format_fallbacks() {
        let f = Format3D::new(InputLayout::SideBySideRL, OutputLayout::None);
        assert_eq!(f.output(), OutputLayout::SideBySide);
        let f = Format3D::new(InputLayout::None, OutputLayout::TopBottom);
        assert_eq!(f.input(), InputLayout::TopBottom);
        let f = Format3D::new(InputLayout::SideBySideLR, OutputLayout::Monoscopic);
        assert_eq!(f.output(), OutputLayout::Monoscopic);
        assert_eq!(Format3D::new(InputLayout::None, OutputLayout::None), Format3D::NONE);
    }

    #[test]
    fn test_format_bits() {
        let f = Format3D::new(InputLayout::SideBySideRL, OutputLayout::TopBottom);
        assert_eq!(f.bits(), 0x8_2000);
        assert_eq!(Format3D::from_bits(f.bits()).unwrap(), f);
        assert!(Format3D::from_bits(0x3_0000).is_err());
        assert!(Format3D::from_bits(0x3000).is_err());
        assert_eq!(OutputLayout::TopBottom.announce_bits(), 2);
        assert_eq!(OutputLayout::None.announce_bits(), 0);
    }

    #[test]
    fn test_side_by_side_input() {
        let l = split(InputLayout::SideBySideLR, OutputLayout::SideBySide, CROP, DEST, 0).unwrap();
        let r = split(InputLayout::SideBySideLR, OutputLayout::SideBySide, CROP, DEST, 1).unwrap();
        assert_eq!(l.source, Rect::new(0, 0, 640, 720));
        assert_eq!(r.source, Rect::new(640, 0, 640, 720));
        assert_eq!(l.dest, Rect::new(0, 0, 960, 1080));
        assert_eq!(r.dest, Rect::new(960, 0, 960, 1080));
        assert_eq!(l.eye, Some(Eye::Left));
        assert_eq!(r.eye, Some(Eye::Right));
    }

    #[test]
    fn test_side_by_side_rl_swaps_halves() {
        let l = split(InputLayout::SideBySideRL, OutputLayout::SideBySide, CROP, DEST, 0).unwrap();
        let r = split(InputLayout::SideBySideRL, OutputLayout::SideBySide, CROP, DEST, 1).unwrap();
        assert_eq!(l.source, Rect::new(640, 0, 640, 720));
        assert_eq!(r.source, Rect::new(0, 0, 640, 720));
    }

    #[test]
    fn test_top_bottom_output() {
        let g = split(InputLayout::TopBottom, OutputLayout::TopBottom, CROP, DEST, 1).unwrap();
        assert_eq!(g.source, Rect::new(0, 360, 1280, 360));
        assert_eq!(g.dest, Rect::new(0, 540, 1920, 540));
    }

    #[test]
    fn test_monoscopic_uses_left_eye_full_dest() {
        let g = split(InputLayout::SideBySideLR, OutputLayout::Monoscopic, CROP, DEST, 1).unwrap();
        assert_eq!(g.source, Rect::new(0, 0, 640, 720));
        assert_eq!(g.dest, DEST);
        assert_eq!(g.eye, Some(Eye::Left));
        let g = split(InputLayout::SideBySideRL, OutputLayout::Monoscopic, CROP, DEST, 1).unwrap();
        assert_eq!(g.source, Rect::new(640, 0, 640, 720));
    }

    #[test]
    fn test_interleaved_is_reported() {
        let err = split(InputLayout::Interleaved, OutputLayout::SideBySide, CROP, DEST, 0);
        assert!(matches!(err, Err(Error::UnsupportedLayout(_))));
        let err = split(InputLayout::TopBottom, OutputLayout::Interleaved, CROP, DEST, 0);
        assert!(matches!(err, Err(Error::UnsupportedLayout(_))));
    }

    #[test]
    fn test_plain_2d() {
        let g = split(InputLayout::None, OutputLayout::None, CROP, DEST, 0).unwrap();
        assert_eq!(g.source, CROP);
        assert_eq!(g.dest, DEST);
        assert_eq!(g.eye, None);
        assert!(split(InputLayout::None, OutputLayout::None, CROP, DEST, 2).is_err());
    }
}
