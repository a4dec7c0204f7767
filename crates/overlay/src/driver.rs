// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Display driver collaborator.
//!
//! The overlay core never talks to the kernel itself. Pipes, the rotator and
//! frame submission are reached through [`DisplayDriver`], which a platform
//! backend implements on top of its device-control interface. Every call may
//! block.
//!
//! Descriptors travel as request/response pairs: the driver is free to
//! adjust fields when it accepts a descriptor, so the value returned by
//! [`DisplayDriver::commit`] is the authoritative one and callers read the
//! current descriptor back before modifying it.

use crate::fourcc::ColorFormat;
use crate::geometry::{Rect, Size};
use crate::transform::Transform;
use crate::Error;
use bitflags::bitflags;
use serde::Serialize;
use std::fmt;
use unix_ts::Timestamp;

/// Physical display a pipe scans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DisplayId {
    /// The built-in panel
    Panel,
    /// An external display (HDMI/DisplayPort)
    External,
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayId::Panel => write!(f, "panel"),
            DisplayId::External => write!(f, "external"),
        }
    }
}

/// Opaque handle of an open pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PipeHandle(pub u32);

/// Opaque handle of a rotator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub u32);

bitflags! {
    /// Per-pipe flags carried in an [`OverlayDescriptor`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OverlayFlags: u32 {
        /// Pipe may be time-shared between the UI and the video overlay
        const PIPE_SHARE = 1 << 0;
        /// Buffers arrive pre-rotated from the rotator
        const ROTATED_SOURCE = 1 << 1;
        /// Pipe carries the left eye of a stereo pair
        const STEREO_LEFT = 1 << 2;
        /// Pipe carries the right eye of a stereo pair
        const STEREO_RIGHT = 1 << 3;
        /// Set by the driver on every accepted descriptor
        const COMMITTED = 1 << 31;
    }
}

/// Complete pipe configuration as exchanged with the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayDescriptor {
    /// Size of the buffer the pipe fetches from
    pub source: Size,
    pub format: ColorFormat,
    /// Region of the buffer to fetch
    pub crop: Rect,
    /// Region of the display to scan out to
    pub dest: Rect,
    /// Transform the pipe applies while scanning out
    pub transform: Transform,
    pub flags: OverlayFlags,
}

impl Default for OverlayDescriptor {
    fn default() -> Self {
        OverlayDescriptor {
            source: Size::default(),
            format: ColorFormat::NV12,
            crop: Rect::default(),
            dest: Rect::default(),
            transform: Transform::Identity,
            flags: OverlayFlags::empty(),
        }
    }
}

/// Parameters of a rotator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotatorParams {
    /// Unrotated source size
    pub source: Size,
    pub format: ColorFormat,
    pub transform: Transform,
    /// Number of output slots the session writes into
    pub buffers: usize,
    /// Byte size of one output slot
    pub slot_size: u64,
}

/// Memory a submitted frame lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    /// Caller-owned buffer, identified by file descriptor
    Fd(i32),
    /// Output memory of a rotator session
    Rotator(SessionId),
}

/// One frame handed to a pipe.
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub memory: Memory,
    pub offset: u64,
    pub timestamp: Option<Timestamp>,
}

/// Operations the overlay core needs from the display hardware.
pub trait DisplayDriver {
    /// Current mode of `display`. Fails when the display is absent.
    fn display_size(&mut self, display: DisplayId) -> Result<Size, Error>;

    fn open_pipe(&mut self, display: DisplayId) -> Result<PipeHandle, Error>;

    /// Submits `desc` and returns the descriptor the driver accepted.
    fn commit(
        &mut self,
        pipe: PipeHandle,
        desc: &OverlayDescriptor,
    ) -> Result<OverlayDescriptor, Error>;

    fn read_descriptor(&mut self, pipe: PipeHandle) -> Result<OverlayDescriptor, Error>;

    fn close_pipe(&mut self, pipe: PipeHandle);

    fn rotator_start(&mut self, params: &RotatorParams) -> Result<SessionId, Error>;

    /// Rotates the frame at `src_offset` into the session output at `dst_offset`.
    fn rotator_apply(
        &mut self,
        session: SessionId,
        src: &BufferDescriptor,
        dst_offset: u64,
    ) -> Result<(), Error>;

    fn rotator_finish(&mut self, session: SessionId);

    fn submit_frame(&mut self, pipe: PipeHandle, buffer: &BufferDescriptor) -> Result<(), Error>;
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for &mut D {
    fn display_size(&mut self, display: DisplayId) -> Result<Size, Error> {
        (**self).display_size(display)
    }

    fn open_pipe(&mut self, display: DisplayId) -> Result<PipeHandle, Error> {
        (**self).open_pipe(display)
    }

    fn commit(
        &mut self,
        pipe: PipeHandle,
        desc: &OverlayDescriptor,
    ) -> Result<OverlayDescriptor, Error> {
        (**self).commit(pipe, desc)
    }

    fn read_descriptor(&mut self, pipe: PipeHandle) -> Result<OverlayDescriptor, Error> {
        (**self).read_descriptor(pipe)
    }

    fn close_pipe(&mut self, pipe: PipeHandle) {
        (**self).close_pipe(pipe)
    }

    fn rotator_start(&mut self, params: &RotatorParams) -> Result<SessionId, Error> {
        (**self).rotator_start(params)
    }

    fn rotator_apply(
        &mut self,
        session: SessionId,
        src: &BufferDescriptor,
        dst_offset: u64,
    ) -> Result<(), Error> {
        (**self).rotator_apply(session, src, dst_offset)
    }

    fn rotator_finish(&mut self, session: SessionId) {
        (**self).rotator_finish(session)
    }

    fn submit_frame(&mut self, pipe: PipeHandle, buffer: &BufferDescriptor) -> Result<(), Error> {
        (**self).submit_frame(pipe, buffer)
    }
}
