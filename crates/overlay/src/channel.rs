// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! One overlay channel: a display pipe plus its optional rotator session.
//!
//! The channel keeps the crop in the coordinate space of its committed
//! transform, so a rotation change only applies the corrective transform
//! (see [`crate::transform::recompose`]). The destination is derived from
//! the caller's requested position by clamping it to the display, limiting
//! it to the magnification the pipe supports and, while a transform is
//! active, aligning every field to an even value.
//!
//! Every mutator is transactional. The new descriptor is committed first and
//! the channel's fields only change once the driver accepted it; a failed
//! call leaves the channel exactly as it was.

use crate::config::PipeLimits;
use crate::driver::{
    BufferDescriptor, DisplayDriver, DisplayId, OverlayDescriptor, OverlayFlags, PipeHandle,
    RotatorParams,
};
use crate::fourcc::ColorFormat;
use crate::geometry::{Rect, Size};
use crate::pipeline::RotationPipeline;
use crate::stereo::Eye;
use crate::transform::{recompose, Transform};
use crate::Error;

/// Parameters of [`OverlayChannel::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Unrotated source buffer size
    pub source: Size,
    pub format: ColorFormat,
    /// Transform to start with
    pub transform: Transform,
    /// Route buffers through a rotator ring of this depth while a transform
    /// is active. `None` lets the pipe rotate on the fly.
    pub rotator_buffers: Option<usize>,
    pub pipe_sharing: bool,
    pub eye: Option<Eye>,
}

impl ChannelConfig {
    pub fn new(width: i32, height: i32, format: ColorFormat) -> Self {
        ChannelConfig {
            source: Size::new(width, height),
            format,
            transform: Transform::Identity,
            rotator_buffers: None,
            pipe_sharing: false,
            eye: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_rotator(mut self, buffers: usize) -> Self {
        self.rotator_buffers = Some(buffers);
        self
    }

    pub fn with_pipe_sharing(mut self, enabled: bool) -> Self {
        self.pipe_sharing = enabled;
        self
    }

    pub fn with_eye(mut self, eye: Option<Eye>) -> Self {
        self.eye = eye;
        self
    }
}

/// Candidate geometry of a commit.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    crop: Rect,
    dest: Rect,
    transform: Transform,
    pipe_sharing: bool,
    rotated_source: bool,
}

#[derive(Debug)]
pub struct OverlayChannel {
    index: usize,
    display: DisplayId,
    limits: PipeLimits,
    pipe: PipeHandle,
    bounds: Size,
    config: ChannelConfig,
    crop: Rect,
    requested_dest: Rect,
    dest: Rect,
    transform: Transform,
    pipe_sharing: bool,
    rotator: Option<RotationPipeline>,
    committed: OverlayDescriptor,
    frames: u64,
}

impl OverlayChannel {
    /// Opens a pipe on `display` (and a rotator session when needed) and
    /// commits the full source onto the full display.
    ///
    /// Fails with [`Error::ResourceExhausted`] when the source or rotator
    /// ring exceeds `limits` or no pipe is free, and with [`Error::Device`]
    /// when the driver rejects the descriptor. Anything opened before the
    /// failure is closed again.
    pub fn configure<D: DisplayDriver>(
        driver: &mut D,
        index: usize,
        display: DisplayId,
        config: ChannelConfig,
        limits: PipeLimits,
    ) -> Result<Self, Error> {
        Self::validate(&config, &limits)?;

        let bounds = driver.display_size(display)?;
        let pipe = driver.open_pipe(display)?;

        let rotator = match Self::start_rotator(driver, &config, config.transform) {
            Ok(rotator) => rotator,
            Err(err) => {
                driver.close_pipe(pipe);
                return Err(err);
            }
        };

        let mut channel = OverlayChannel {
            index,
            display,
            limits,
            pipe,
            bounds,
            config,
            crop: config.transform.apply_to_size(config.source).to_rect(),
            requested_dest: bounds.to_rect(),
            dest: Rect::default(),
            transform: config.transform,
            pipe_sharing: config.pipe_sharing,
            rotator,
            committed: OverlayDescriptor::default(),
            frames: 0,
        };

        let result = channel
            .derive_dest(channel.requested_dest, channel.crop, channel.transform)
            .and_then(|dest| {
                let geometry = Geometry {
                    dest,
                    ..channel.geometry()
                };
                channel.commit(driver, &geometry)?;
                Ok(dest)
            });

        match result {
            Ok(dest) => {
                channel.dest = dest;
                log::info!(
                    "channel {} on {} (pipe {}): {} {} {} rotator {}",
                    index,
                    display,
                    pipe.0,
                    config.source,
                    config.format,
                    config.transform,
                    if channel.rotator.is_some() { "on" } else { "off" }
                );
                Ok(channel)
            }
            Err(err) => {
                channel.close(driver);
                Err(err)
            }
        }
    }

    fn validate(config: &ChannelConfig, limits: &PipeLimits) -> Result<(), Error> {
        if config.source.is_empty() {
            return Err(Error::InvalidGeometry(format!(
                "empty source {}",
                config.source
            )));
        }
        if !config.format.is_supported() {
            return Err(Error::InvalidArgument(format!(
                "unsupported color format {}",
                config.format
            )));
        }
        let odd = config.source.width % 2 != 0 || config.source.height % 2 != 0;
        if config.format.is_yuv420() && odd {
            return Err(Error::InvalidGeometry(format!(
                "{} source {} must have even dimensions",
                config.format, config.source
            )));
        }
        if config.source.width > limits.max_source_width
            || config.source.height > limits.max_source_height
        {
            return Err(Error::ResourceExhausted(format!(
                "source {} exceeds pipe limit {}x{}",
                config.source, limits.max_source_width, limits.max_source_height
            )));
        }
        if let Some(buffers) = config.rotator_buffers {
            if buffers > limits.max_rotator_buffers {
                return Err(Error::ResourceExhausted(format!(
                    "{} rotator buffers requested, limit is {}",
                    buffers, limits.max_rotator_buffers
                )));
            }
        }
        Ok(())
    }

    fn start_rotator<D: DisplayDriver>(
        driver: &mut D,
        config: &ChannelConfig,
        transform: Transform,
    ) -> Result<Option<RotationPipeline>, Error> {
        let buffers = match config.rotator_buffers {
            Some(buffers) if !transform.is_identity() => buffers,
            _ => return Ok(None),
        };
        let slot_size = config
            .format
            .frame_size(config.source.width as u32, config.source.height as u32)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("unsupported color format {}", config.format))
            })?;
        let params = RotatorParams {
            source: config.source,
            format: config.format,
            transform,
            buffers,
            slot_size,
        };
        RotationPipeline::start(driver, params).map(Some)
    }

    /// Clamps `requested` to the display, to the magnification limit over
    /// `crop` and, under a transform, to even values.
    fn derive_dest(
        &self,
        requested: Rect,
        crop: Rect,
        transform: Transform,
    ) -> Result<Rect, Error> {
        let mut dest = requested
            .clamp_to(self.bounds)
            .limit_scale(crop.size(), self.limits.max_magnification);
        if !transform.is_identity() {
            dest = dest.align_even();
        }
        if dest.width < self.limits.min_dest_size || dest.height < self.limits.min_dest_size {
            return Err(Error::InvalidGeometry(format!(
                "destination {} (requested {}) below minimum pipe size {}",
                dest, requested, self.limits.min_dest_size
            )));
        }
        Ok(dest)
    }

    fn geometry(&self) -> Geometry {
        Geometry {
            crop: self.crop,
            dest: self.dest,
            transform: self.transform,
            pipe_sharing: self.pipe_sharing,
            rotated_source: self.rotator.is_some(),
        }
    }

    /// Reads the current descriptor, applies `g` and commits it. The
    /// driver's answer becomes the committed descriptor.
    fn commit<D: DisplayDriver>(&mut self, driver: &mut D, g: &Geometry) -> Result<(), Error> {
        let mut desc = driver.read_descriptor(self.pipe)?;
        let rotated_size = g.transform.apply_to_size(self.config.source);

        desc.format = self.config.format;
        desc.dest = g.dest;
        if g.rotated_source {
            desc.source = rotated_size;
            desc.crop = g.crop;
            desc.transform = Transform::Identity;
        } else {
            desc.source = self.config.source;
            desc.crop = g.transform.inverse().apply_to_rect(g.crop, rotated_size);
            desc.transform = g.transform;
        }

        desc.flags.remove(
            OverlayFlags::PIPE_SHARE
                | OverlayFlags::ROTATED_SOURCE
                | OverlayFlags::STEREO_LEFT
                | OverlayFlags::STEREO_RIGHT,
        );
        desc.flags.set(OverlayFlags::PIPE_SHARE, g.pipe_sharing);
        desc.flags.set(OverlayFlags::ROTATED_SOURCE, g.rotated_source);
        match self.config.eye {
            Some(Eye::Left) => desc.flags.insert(OverlayFlags::STEREO_LEFT),
            Some(Eye::Right) => desc.flags.insert(OverlayFlags::STEREO_RIGHT),
            None => {}
        }

        self.committed = driver.commit(self.pipe, &desc)?;
        log::debug!(
            "channel {} commit: crop {} dest {} {} flags {:?}",
            self.index,
            self.committed.crop,
            self.committed.dest,
            self.committed.transform,
            self.committed.flags
        );
        Ok(())
    }

    /// Sets the crop, given in unrotated source coordinates.
    pub fn set_crop<D: DisplayDriver>(&mut self, driver: &mut D, crop: Rect) -> Result<(), Error> {
        if !crop.fits_within(self.config.source) {
            return Err(Error::InvalidGeometry(format!(
                "crop {} outside source {}",
                crop, self.config.source
            )));
        }

        let crop = self.transform.apply_to_rect(crop, self.config.source);
        let dest = self.derive_dest(self.requested_dest, crop, self.transform)?;
        let geometry = Geometry {
            crop,
            dest,
            ..self.geometry()
        };
        self.commit(driver, &geometry)?;
        self.crop = crop;
        self.dest = dest;
        Ok(())
    }

    /// Places the channel at `position` in display coordinates.
    pub fn set_position<D: DisplayDriver>(
        &mut self,
        driver: &mut D,
        position: Rect,
    ) -> Result<(), Error> {
        let dest = self.derive_dest(position, self.crop, self.transform)?;
        let geometry = Geometry {
            dest,
            ..self.geometry()
        };
        self.commit(driver, &geometry)?;
        self.requested_dest = position;
        self.dest = dest;
        Ok(())
    }

    /// Switches to the absolute transform `requested`.
    ///
    /// The rotator session follows the transform: it is opened, replaced or
    /// closed as needed. A new session is started before the old one is
    /// finished so that a failure can fall back to the old one untouched.
    pub fn set_rotation<D: DisplayDriver>(
        &mut self,
        driver: &mut D,
        requested: Transform,
    ) -> Result<(), Error> {
        if requested == self.transform {
            return Ok(());
        }

        let next = recompose(self.transform, self.crop, self.config.source, requested);
        let dest = self.derive_dest(self.requested_dest, next.crop, next.transform)?;

        let rotator = Self::start_rotator(driver, &self.config, next.transform)?;
        let geometry = Geometry {
            crop: next.crop,
            dest,
            transform: next.transform,
            pipe_sharing: self.pipe_sharing,
            rotated_source: rotator.is_some(),
        };
        if let Err(err) = self.commit(driver, &geometry) {
            if let Some(rotator) = rotator {
                rotator.finish(driver);
            }
            return Err(err);
        }

        if let Some(old) = std::mem::replace(&mut self.rotator, rotator) {
            old.finish(driver);
        }
        log::info!(
            "channel {} transform {} -> {}",
            self.index,
            self.transform,
            next.transform
        );
        self.transform = next.transform;
        self.crop = next.crop;
        self.dest = dest;
        Ok(())
    }

    pub fn set_pipe_sharing<D: DisplayDriver>(
        &mut self,
        driver: &mut D,
        enabled: bool,
    ) -> Result<(), Error> {
        if enabled == self.pipe_sharing {
            return Ok(());
        }
        let geometry = Geometry {
            pipe_sharing: enabled,
            ..self.geometry()
        };
        self.commit(driver, &geometry)?;
        self.pipe_sharing = enabled;
        Ok(())
    }

    /// Submits one frame, through the rotator ring when a session is open.
    pub fn queue_buffer<D: DisplayDriver>(
        &mut self,
        driver: &mut D,
        buffer: &BufferDescriptor,
    ) -> Result<(), Error> {
        match self.rotator.as_mut() {
            Some(rotator) => {
                let rotated = rotator.submit(driver, buffer)?;
                driver.submit_frame(self.pipe, &rotated)?;
            }
            None => driver.submit_frame(self.pipe, buffer)?,
        }
        self.frames += 1;
        Ok(())
    }

    /// Finishes the rotator session and closes the pipe.
    pub fn close<D: DisplayDriver>(mut self, driver: &mut D) {
        if let Some(rotator) = self.rotator.take() {
            rotator.finish(driver);
        }
        driver.close_pipe(self.pipe);
        log::info!(
            "channel {} closed (pipe {}, {} frames)",
            self.index,
            self.pipe.0,
            self.frames
        );
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn display(&self) -> DisplayId {
        self.display
    }

    pub fn pipe(&self) -> PipeHandle {
        self.pipe
    }

    /// Unrotated source size.
    pub fn source(&self) -> Size {
        self.config.source
    }

    pub fn format(&self) -> ColorFormat {
        self.config.format
    }

    /// Crop in the coordinate space of the committed transform.
    pub fn crop(&self) -> Rect {
        self.crop
    }

    /// Crop in unrotated source coordinates.
    pub fn source_crop(&self) -> Rect {
        self.transform
            .inverse()
            .apply_to_rect(self.crop, self.transform.apply_to_size(self.config.source))
    }

    /// Committed destination.
    pub fn dest(&self) -> Rect {
        self.dest
    }

    /// Destination as last requested, before clamping.
    pub fn requested_dest(&self) -> Rect {
        self.requested_dest
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn pipe_sharing(&self) -> bool {
        self.pipe_sharing
    }

    pub fn eye(&self) -> Option<Eye> {
        self.config.eye
    }

    /// Size of the display the channel scans out to.
    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn rotator_session_open(&self) -> bool {
        self.rotator.is_some()
    }

    pub fn rotator(&self) -> Option<&RotationPipeline> {
        self.rotator.as_ref()
    }

    /// Descriptor as last accepted by the driver.
    pub fn descriptor(&self) -> &OverlayDescriptor {
        &self.committed
    }

    pub fn frames_queued(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Memory;
    use crate::sim::SimulatedDriver;

    fn driver() -> SimulatedDriver {
        SimulatedDriver::new((1280, 800), None)
    }

    fn open(driver: &mut SimulatedDriver, config: ChannelConfig) -> OverlayChannel {
        OverlayChannel::configure(driver, 0, DisplayId::Panel, config, PipeLimits::default()).unwrap()
    }

    fn frame(offset: u64) -> BufferDescriptor {
        BufferDescriptor {
            memory: Memory::Fd(3),
            offset,
            timestamp: None,
        }
    }

    #[test]
    fn test_configure_defaults_to_full_geometry() {
        let mut drv = driver();
        let ch = open(&mut drv, ChannelConfig::new(320, 200, ColorFormat::NV12));
        assert_eq!(ch.crop(), Rect::new(0, 0, 320, 200));
        assert_eq!(ch.dest(), Rect::new(0, 0, 1280, 800));
        assert!(ch.descriptor().flags.contains(OverlayFlags::COMMITTED));
        assert_eq!(drv.open_pipes(), 1);
    }

    #[test]
    fn test_configure_rejects_oversized_source() {
        let mut drv = driver();
        let err = OverlayChannel::configure(
            &mut drv,
            0,
            DisplayId::Panel,
            ChannelConfig::new(4096, 2160, ColorFormat::NV12),
            PipeLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted(_)));
        assert_eq!(drv.open_pipes(), 0);
    }

    #[test]
    fn test_configure_failure_closes_everything() {
        let mut drv = driver();
        drv.fail_commit_after(0);
        let config = ChannelConfig::new(320, 240, ColorFormat::RGBA)
            .with_transform(Transform::Rot90)
            .with_rotator(3);
        let err = OverlayChannel::configure(&mut drv, 0, DisplayId::Panel, config, PipeLimits::default())
            .unwrap_err();
        assert!(err.is_device_error());
        assert_eq!(drv.open_pipes(), 0);
        assert_eq!(drv.open_sessions(), 0);

        drv.clear_faults();
        drv.fail_rotator_start(true);
        assert!(OverlayChannel::configure(&mut drv, 0, DisplayId::Panel, config, PipeLimits::default()).is_err());
        assert_eq!(drv.open_pipes(), 0);
    }

    #[test]
    fn test_configure_rejects_bad_arguments() {
        let mut drv = driver();
        let limits = PipeLimits::default();
        let bad_format = ChannelConfig::new(320, 240, ColorFormat(*b"H264"));
        assert!(matches!(
            OverlayChannel::configure(&mut drv, 0, DisplayId::Panel, bad_format, limits),
            Err(Error::InvalidArgument(_))
        ));
        let odd_nv12 = ChannelConfig::new(321, 240, ColorFormat::NV12);
        assert!(matches!(
            OverlayChannel::configure(&mut drv, 0, DisplayId::Panel, odd_nv12, limits),
            Err(Error::InvalidGeometry(_))
        ));
        let deep_ring = ChannelConfig::new(320, 240, ColorFormat::NV12).with_rotator(64);
        assert!(matches!(
            OverlayChannel::configure(&mut drv, 0, DisplayId::Panel, deep_ring, limits),
            Err(Error::ResourceExhausted(_))
        ));
        assert_eq!(drv.open_pipes(), 0);
    }

    #[test]
    fn test_magnification_clamp() {
        let mut drv = SimulatedDriver::new((2048, 2048), None);
        let mut ch = open(&mut drv, ChannelConfig::new(640, 480, ColorFormat::RGBA));
        ch.set_crop(&mut drv, Rect::new(0, 0, 100, 50)).unwrap();
        ch.set_position(&mut drv, Rect::new(0, 0, 2000, 2000)).unwrap();
        assert_eq!(ch.dest(), Rect::new(0, 0, 800, 400));
        assert_eq!(ch.requested_dest(), Rect::new(0, 0, 2000, 2000));

        // a larger crop lets the requested destination grow back
        ch.set_crop(&mut drv, Rect::new(0, 0, 400, 300)).unwrap();
        assert_eq!(ch.dest(), Rect::new(0, 0, 2000, 2000));
    }

    #[test]
    fn test_position_clamped_to_display() {
        let mut drv = driver();
        let mut ch = open(&mut drv, ChannelConfig::new(640, 480, ColorFormat::RGBA));
        ch.set_position(&mut drv, Rect::new(-20, 600, 700, 400)).unwrap();
        assert_eq!(ch.dest(), Rect::new(0, 600, 680, 200));
        assert!(ch.set_position(&mut drv, Rect::new(1300, 0, 100, 100)).is_err());
        assert_eq!(ch.dest(), Rect::new(0, 600, 680, 200));
    }

    #[test]
    fn test_even_destination_under_rotation() {
        let mut drv = driver();
        let mut ch = open(&mut drv, ChannelConfig::new(640, 480, ColorFormat::RGBA));
        ch.set_rotation(&mut drv, Transform::Rot90).unwrap();
        ch.set_position(&mut drv, Rect::new(101, 51, 301, 151)).unwrap();
        assert_eq!(ch.dest(), Rect::new(100, 50, 300, 150));

        ch.set_rotation(&mut drv, Transform::Identity).unwrap();
        ch.set_position(&mut drv, Rect::new(101, 51, 301, 151)).unwrap();
        assert_eq!(ch.dest(), Rect::new(101, 51, 301, 151));
    }

    #[test]
    fn test_crop_outside_source_is_rejected() {
        let mut drv = driver();
        let mut ch = open(&mut drv, ChannelConfig::new(640, 480, ColorFormat::RGBA));
        let before = *ch.descriptor();
        assert!(matches!(
            ch.set_crop(&mut drv, Rect::new(600, 0, 100, 100)),
            Err(Error::InvalidGeometry(_))
        ));
        assert_eq!(*ch.descriptor(), before);
    }

    #[test]
    fn test_rotation_keeps_crop_in_rotated_space() {
        let mut drv = driver();
        let mut ch = open(&mut drv, ChannelConfig::new(200, 100, ColorFormat::RGBA));
        ch.set_crop(&mut drv, Rect::new(10, 20, 50, 30)).unwrap();
        ch.set_rotation(&mut drv, Transform::Rot90).unwrap();
        assert_eq!(ch.crop(), Rect::new(50, 10, 30, 50));
        assert_eq!(ch.source_crop(), Rect::new(10, 20, 50, 30));
        // the pipe rotates on the fly: it receives the unrotated crop
        assert_eq!(ch.descriptor().crop, Rect::new(10, 20, 50, 30));
        assert_eq!(ch.descriptor().transform, Transform::Rot90);

        ch.set_rotation(&mut drv, Transform::Rot270).unwrap();
        assert_eq!(ch.crop(), Rect::new(20, 140, 30, 50));
        // crops set under a transform are given in source coordinates
        ch.set_crop(&mut drv, Rect::new(0, 0, 200, 100)).unwrap();
        assert_eq!(ch.crop(), Rect::new(0, 0, 100, 200));
    }

    #[test]
    fn test_failed_rotation_reverts() {
        let mut drv = driver();
        let config = ChannelConfig::new(320, 240, ColorFormat::RGBA).with_rotator(2);
        let mut ch = open(&mut drv, config);
        assert!(!ch.rotator_session_open());

        drv.fail_commit_after(0);
        assert!(ch.set_rotation(&mut drv, Transform::Rot90).is_err());
        assert_eq!(ch.transform(), Transform::Identity);
        assert!(!ch.rotator_session_open());
        assert_eq!(drv.open_sessions(), 0);
        assert_eq!(ch.crop(), Rect::new(0, 0, 320, 240));
    }

    #[test]
    fn test_rotator_follows_transform() {
        let mut drv = driver();
        let config = ChannelConfig::new(320, 240, ColorFormat::RGBA).with_rotator(3);
        let mut ch = open(&mut drv, config);

        ch.set_rotation(&mut drv, Transform::Rot90).unwrap();
        assert!(ch.rotator_session_open());
        assert_eq!(drv.open_sessions(), 1);
        let desc = ch.descriptor();
        assert!(desc.flags.contains(OverlayFlags::ROTATED_SOURCE));
        assert_eq!(desc.source, Size::new(240, 320));
        assert_eq!(desc.transform, Transform::Identity);

        for k in 0..4 {
            ch.queue_buffer(&mut drv, &frame(k)).unwrap();
        }
        assert_eq!(drv.rotations(), 4);
        assert_eq!(drv.frames_submitted(), 4);

        ch.set_rotation(&mut drv, Transform::Rot180).unwrap();
        assert_eq!(drv.open_sessions(), 1);
        assert_eq!(ch.rotator().unwrap().submitted(), 0);

        ch.set_rotation(&mut drv, Transform::Identity).unwrap();
        assert!(!ch.rotator_session_open());
        assert_eq!(drv.open_sessions(), 0);
        ch.queue_buffer(&mut drv, &frame(9)).unwrap();
        assert_eq!(drv.rotations(), 4);

        ch.close(&mut drv);
        assert_eq!(drv.open_pipes(), 0);
    }

    #[test]
    fn test_pipe_sharing_flag() {
        let mut drv = driver();
        let mut ch = open(&mut drv, ChannelConfig::new(320, 240, ColorFormat::RGBA).with_eye(Some(Eye::Right)));
        assert!(ch.descriptor().flags.contains(OverlayFlags::STEREO_RIGHT));
        ch.set_pipe_sharing(&mut drv, true).unwrap();
        assert!(ch.pipe_sharing());
        assert!(drv
            .descriptor(ch.pipe())
            .unwrap()
            .flags
            .contains(OverlayFlags::PIPE_SHARE));
    }
}
