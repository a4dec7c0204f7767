// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies
//
// Based on https://docs.rs/crate/four-cc/latest, reduced to the pixel formats
// the overlay pipes accept and extended with frame size computation.

use core::fmt;
use serde::{Serialize, Serializer};

/// Pixel format of an overlay source, identified by its fourcc code.
///
/// The numeric form is little-endian (`'N' | 'V' << 8 | ...`) which matches
/// the V4L2 and DRM conventions used by display drivers.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorFormat(pub [u8; 4]);

impl ColorFormat {
    /// Semi-planar 4:2:0, interleaved CbCr
    pub const NV12: ColorFormat = ColorFormat(*b"NV12");
    /// Semi-planar 4:2:0, interleaved CrCb
    pub const NV21: ColorFormat = ColorFormat(*b"NV21");
    /// Planar 4:2:0, Cr before Cb
    pub const YV12: ColorFormat = ColorFormat(*b"YV12");
    /// Packed 4:2:2 Y0 Cb Y1 Cr
    pub const YUYV: ColorFormat = ColorFormat(*b"YUYV");
    /// Packed 4:2:2 Cb Y0 Cr Y1
    pub const UYVY: ColorFormat = ColorFormat(*b"UYVY");
    /// 16-bit RGB 5:6:5
    pub const RGB565: ColorFormat = ColorFormat(*b"RGBP");
    /// 24-bit RGB
    pub const RGB3: ColorFormat = ColorFormat(*b"RGB3");
    /// 24-bit BGR
    pub const BGR3: ColorFormat = ColorFormat(*b"BGR3");
    /// 32-bit RGBA
    pub const RGBA: ColorFormat = ColorFormat(*b"RGBA");
    /// 32-bit BGRA
    pub const BGRA: ColorFormat = ColorFormat(*b"BGRA");
    /// 32-bit XRGB, alpha ignored
    pub const XRGB: ColorFormat = ColorFormat(*b"XR24");

    /// Byte size of one frame at `width` x `height`, or `None` when the
    /// format is not one the overlay pipes can scan out.
    ///
    /// ```
    /// use overlay::fourcc::ColorFormat;
    /// assert_eq!(ColorFormat::NV12.frame_size(1280, 720), Some(1280 * 720 * 3 / 2));
    /// assert_eq!(ColorFormat::RGBA.frame_size(2, 2), Some(16));
    /// assert_eq!(ColorFormat(*b"H264").frame_size(2, 2), None);
    /// ```
    pub fn frame_size(self, width: u32, height: u32) -> Option<u64> {
        let pixels = width as u64 * height as u64;
        match self {
            Self::NV12 | Self::NV21 | Self::YV12 => Some(pixels * 3 / 2),
            Self::YUYV | Self::UYVY | Self::RGB565 => Some(pixels * 2),
            Self::RGB3 | Self::BGR3 => Some(pixels * 3),
            Self::RGBA | Self::BGRA | Self::XRGB => Some(pixels * 4),
            _ => None,
        }
    }

    /// True for formats whose chroma is subsampled vertically. Such sources
    /// need even crop offsets so that chroma rows stay aligned.
    pub fn is_yuv420(self) -> bool {
        matches!(self, Self::NV12 | Self::NV21 | Self::YV12)
    }

    /// True when [`frame_size`](Self::frame_size) knows this format.
    pub fn is_supported(self) -> bool {
        self.frame_size(1, 1).is_some()
    }
}

impl From<&[u8; 4]> for ColorFormat {
    fn from(buf: &[u8; 4]) -> ColorFormat {
        ColorFormat(*buf)
    }
}

impl From<u32> for ColorFormat {
    fn from(val: u32) -> ColorFormat {
        ColorFormat(val.to_le_bytes())
    }
}

impl From<ColorFormat> for u32 {
    fn from(val: ColorFormat) -> Self {
        u32::from_le_bytes(val.0)
    }
}

impl core::str::FromStr for ColorFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(crate::Error::InvalidArgument(format!(
                "fourcc must be exactly 4 characters: {}",
                s
            )));
        }
        Ok(ColorFormat([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => {
                // format!() panics on fmt::Error, so escape instead
                for b in self.0 {
                    write!(f, "{}", core::ascii::escape_default(b))?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ColorFormat")
            .field(&format_args!("{}", self))
            .finish()
    }
}

impl Serialize for ColorFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
