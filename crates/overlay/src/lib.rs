// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Overlay Library for Rust
//!
//! Hardware overlay resource management for video scan-out. Given a video
//! source of arbitrary size, color format, rotation and stereoscopic layout,
//! the library decides how many display pipes to allocate, what source crop
//! and destination rectangle each pipe receives, how an optional rotator
//! stage is composed across repeated orientation changes, and how buffers
//! are pipelined through that rotator ahead of display submission.
//!
//! The display hardware itself is reached through the [`driver::DisplayDriver`]
//! trait and the platform capability files through the
//! [`capabilities::Capabilities`] trait. A [`sim::SimulatedDriver`] is
//! provided for testing and dry runs.
//!
//! # Quick Start
//!
//! ```
//! use overlay::capabilities::StaticCapabilities;
//! use overlay::fourcc::ColorFormat;
//! use overlay::overlay::{Overlay, SourceParams};
//! use overlay::sim::SimulatedDriver;
//! use overlay::state::DisplayState;
//! use overlay::stereo::Format3D;
//!
//! let driver = SimulatedDriver::new((1280, 800), Some((1920, 1080)));
//! let caps = StaticCapabilities::default();
//! let mut ov = Overlay::new(driver, caps);
//!
//! ov.set_source(SourceParams::new(1280, 720, ColorFormat::NV12).with_format_3d(Format3D::NONE))?;
//! assert_eq!(ov.state(), DisplayState::TwoDOnPanel);
//! ov.queue_buffer(0, 0)?;
//! # Ok::<(), overlay::Error>(())
//! ```
//!
//! # Threading
//!
//! Nothing in this crate spawns threads or takes locks. Every operation is
//! expected to be driven from a single compositor thread; callers sharing an
//! [`overlay::Overlay`] across threads must serialize access themselves.

use std::{error, fmt, io};

/// Error type for overlay operations
#[derive(Debug)]
pub enum Error {
    /// The display driver rejected or failed a call. Recoverable by tearing
    /// the affected channel down and configuring it again.
    Device(String),

    /// The requested pipe, size or buffer count exceeds the hardware limits
    ResourceExhausted(String),

    /// A crop or position violates bounds or magnification limits
    InvalidGeometry(String),

    /// A stereoscopic layout the layout engine cannot express
    UnsupportedLayout(String),

    /// The operation needs a configured source or channel
    NotConfigured,

    /// A parameter value outside its accepted range
    InvalidArgument(String),

    /// I/O error from capability or configuration files
    Io(io::Error),
}

impl Error {
    /// True when the error originated from the display driver.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device(_))
    }

    /// True when retrying from an unconfigured channel may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Device(_) | Error::Io(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Device(msg) => write!(f, "display driver error: {}", msg),
            Error::ResourceExhausted(msg) => write!(f, "resource exhausted: {}", msg),
            Error::InvalidGeometry(msg) => write!(f, "invalid geometry: {}", msg),
            Error::UnsupportedLayout(msg) => write!(f, "unsupported layout: {}", msg),
            Error::NotConfigured => write!(f, "overlay is not configured"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Platform capability and notification collaborator.
pub mod capabilities;

/// Per-pipe overlay channel state and its transactional mutators.
pub mod channel;

/// Tunable hardware limits and file locations.
pub mod config;

/// Display driver collaborator interface and descriptors.
pub mod driver;

/// Portable handling of fourcc color formats.
pub mod fourcc;

/// Integer rectangle helpers shared by every module.
pub mod geometry;

/// The overlay facade orchestrating channels against the display state.
pub mod overlay;

/// Ring of rotator output slots.
pub mod pipeline;

/// In-memory display driver for tests and dry runs.
pub mod sim;

/// Display configuration resolution.
pub mod state;

/// Stereoscopic layouts and the per-channel split.
pub mod stereo;

/// The eight canonical rotation/flip transforms.
pub mod transform;
