// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Overlay facade.
//!
//! [`Overlay`] owns the display driver, the capability collaborator and up
//! to two [`OverlayChannel`]s. `set_source` resolves the [`DisplayState`]
//! for the source and the connected displays, then rebuilds every channel
//! from scratch: a state transition never reuses a live channel.
//!
//! | State | Channel 0 | Channel 1 | Output |
//! |-------|-----------|-----------|--------|
//! | `UI_MIRROR` | | | |
//! | `2D_ON_PANEL` | panel | | none |
//! | `2D_ON_EXTERNAL` | panel | external | none |
//! | `3D_ON_PANEL_2D_OUT` | | panel | monoscopic |
//! | `3D_ON_PANEL_3D_OUT` | panel | panel | side-by-side |
//! | `3D_ON_EXTERNAL_2D_OUT` | | external | monoscopic |
//! | `3D_ON_EXTERNAL_3D_OUT` | external | external | as requested |

use crate::capabilities::{BarrierOrientation, Capabilities};
use crate::channel::{ChannelConfig, OverlayChannel};
use crate::config::OverlayConfig;
use crate::driver::{BufferDescriptor, DisplayDriver, DisplayId, Memory};
use crate::fourcc::ColorFormat;
use crate::geometry::{fit_aspect, Rect, Size};
use crate::state::{resolve, DisplayState};
use crate::stereo::{split, ChannelGeometry, Format3D, InputLayout, OutputLayout};
use crate::transform::Transform;
use crate::Error;
use serde::Serialize;
use unix_ts::Timestamp;

/// Description of the video source handed to [`Overlay::set_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceParams {
    pub width: i32,
    pub height: i32,
    pub format: ColorFormat,
    pub format_3d: Format3D,
    pub transform: Transform,
    /// Rotator ring depth, `None` to rotate in the pipe
    pub rotator_buffers: Option<usize>,
    pub pipe_sharing: bool,
}

impl SourceParams {
    pub fn new(width: i32, height: i32, format: ColorFormat) -> Self {
        SourceParams {
            width,
            height,
            format,
            format_3d: Format3D::NONE,
            transform: Transform::Identity,
            rotator_buffers: None,
            pipe_sharing: false,
        }
    }

    pub fn with_format_3d(mut self, format_3d: Format3D) -> Self {
        self.format_3d = format_3d;
        self
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

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Runtime parameters accepted by [`Overlay::set_parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Transform(Transform),
    PipeSharing(bool),
}

/// Channels instantiated in `state`, as `(index, display)` pairs.
pub fn channel_plan(state: DisplayState) -> &'static [(usize, DisplayId)] {
    use DisplayId::{External, Panel};
    match state {
        DisplayState::UiMirror => &[],
        DisplayState::TwoDOnPanel => &[(0, Panel)],
        DisplayState::TwoDOnExternal => &[(0, Panel), (1, External)],
        DisplayState::ThreeDOnPanel2DOut => &[(1, Panel)],
        DisplayState::ThreeDOnPanel3DOut => &[(0, Panel), (1, Panel)],
        DisplayState::ThreeDOnExternal2DOut => &[(1, External)],
        DisplayState::ThreeDOnExternal3DOut => &[(0, External), (1, External)],
    }
}

/// Output layout used in `state` for a source of `format`.
pub fn output_layout(state: DisplayState, format: Format3D) -> OutputLayout {
    match state {
        DisplayState::UiMirror | DisplayState::TwoDOnPanel | DisplayState::TwoDOnExternal => {
            OutputLayout::None
        }
        DisplayState::ThreeDOnPanel2DOut | DisplayState::ThreeDOnExternal2DOut => {
            OutputLayout::Monoscopic
        }
        // the lenticular barrier only separates side-by-side columns
        DisplayState::ThreeDOnPanel3DOut => OutputLayout::SideBySide,
        DisplayState::ThreeDOnExternal3DOut => format.output(),
    }
}

/// Display state for a source of `format` given what `caps` reports.
///
/// A source that explicitly asks for monoscopic output never enters a 3D
/// output state, even on 3D-capable displays.
pub fn target_state<C: Capabilities + ?Sized>(caps: &C, format: Format3D) -> DisplayState {
    let wants_3d_out = format.output() != OutputLayout::Monoscopic;
    let external = caps.is_external_connected();
    resolve(
        format.has_stereo_content(),
        external,
        external && wants_3d_out && caps.external_supports_3d(),
        wants_3d_out && caps.panel_is_3d_capable() && caps.user_prefers_panel_3d(),
    )
}

pub struct Overlay<D: DisplayDriver, C: Capabilities> {
    driver: D,
    caps: C,
    config: OverlayConfig,
    state: DisplayState,
    source: Option<SourceParams>,
    /// Source of a rebuild that failed on a driver or resource error,
    /// retried by `refresh`
    retry: Option<SourceParams>,
    input: InputLayout,
    output: OutputLayout,
    transform: Transform,
    /// Crop of the combined source frame, in source coordinates
    crop: Rect,
    /// Caller position on the panel, `None` for the full panel
    position: Option<Rect>,
    channels: [Option<OverlayChannel>; 2],
}

impl<D: DisplayDriver, C: Capabilities> Overlay<D, C> {
    /// Creates an idle overlay. No device resource is opened until
    /// [`set_source`](Self::set_source).
    pub fn new(driver: D, caps: C) -> Self {
        Self::with_config(driver, caps, OverlayConfig::default())
    }

    pub fn with_config(driver: D, caps: C, config: OverlayConfig) -> Self {
        Overlay {
            driver,
            caps,
            config,
            state: DisplayState::UiMirror,
            source: None,
            retry: None,
            input: InputLayout::None,
            output: OutputLayout::None,
            transform: Transform::Identity,
            crop: Rect::default(),
            position: None,
            channels: [None, None],
        }
    }

    /// Configures the overlay for a new source.
    ///
    /// Resolves the display state and rebuilds every channel unless neither
    /// the source nor the state changed. When any channel fails to come up
    /// all channels are closed and the overlay is left in
    /// [`DisplayState::UiMirror`].
    pub fn set_source(&mut self, params: SourceParams) -> Result<(), Error> {
        let state = self.resolve_state(params.format_3d);
        if self.source == Some(params) && self.state == state {
            return Ok(());
        }
        self.rebuild(params, state)
    }

    /// Re-reads the capability collaborator and rebuilds when the display
    /// state changed, e.g. after an external display was plugged in.
    ///
    /// A source whose last rebuild failed on a driver or resource error is
    /// configured again, so display events alone can bring video back.
    pub fn refresh(&mut self) -> Result<DisplayState, Error> {
        let params = match self.source.or(self.retry) {
            Some(params) => params,
            None => return Ok(self.state),
        };
        let state = self.resolve_state(params.format_3d);
        if state != self.state {
            log::info!("display change: {} -> {}", self.state, state);
            self.rebuild(params, state)?;
        }
        Ok(self.state)
    }

    /// Places the video at `position` on the panel. Channels on the
    /// external display keep their own placement.
    pub fn set_position(&mut self, position: Rect) -> Result<(), Error> {
        self.ensure_configured()?;
        let previous = self.position.replace(position);
        if let Err(err) = self.apply_geometry() {
            self.position = previous;
            self.restore_geometry();
            return Err(err);
        }
        Ok(())
    }

    /// Crops the combined source frame. `crop` is in source coordinates and
    /// is split per eye like the full frame.
    pub fn set_crop(&mut self, crop: Rect) -> Result<(), Error> {
        let params = self.source.ok_or(Error::NotConfigured)?;
        self.ensure_configured()?;
        if crop.is_empty() || !crop.fits_within(params.size()) {
            return Err(Error::InvalidGeometry(format!(
                "crop {} outside source {}",
                crop,
                params.size()
            )));
        }
        let previous = std::mem::replace(&mut self.crop, crop);
        if let Err(err) = self.apply_geometry() {
            self.crop = previous;
            self.restore_geometry();
            return Err(err);
        }
        Ok(())
    }

    pub fn set_parameter(&mut self, parameter: Parameter) -> Result<(), Error> {
        match parameter {
            Parameter::Transform(transform) => self.set_transform(transform),
            Parameter::PipeSharing(enabled) => self.set_pipe_sharing(enabled),
        }
    }

    /// Switches every channel to the absolute transform `transform`.
    pub fn set_transform(&mut self, transform: Transform) -> Result<(), Error> {
        self.ensure_configured()?;
        if transform == self.transform {
            return Ok(());
        }

        let previous = std::mem::replace(&mut self.transform, transform);
        if let Err(err) = self.apply_transform() {
            self.transform = previous;
            if let Err(restore) = self.apply_transform() {
                log::warn!("failed to restore transform {}: {}", previous, restore);
            }
            return Err(err);
        }

        if let Some(params) = self.source.as_mut() {
            params.transform = transform;
        }
        if self.state == DisplayState::ThreeDOnPanel3DOut {
            self.set_barrier(self.barrier_orientation());
        }
        Ok(())
    }

    pub fn set_pipe_sharing(&mut self, enabled: bool) -> Result<(), Error> {
        self.ensure_configured()?;
        let previous = self.source.is_some_and(|params| params.pipe_sharing);
        if let Err(err) = self.apply_pipe_sharing(enabled) {
            if let Err(restore) = self.apply_pipe_sharing(previous) {
                log::warn!("failed to restore pipe sharing: {}", restore);
            }
            return Err(err);
        }
        if let Some(params) = self.source.as_mut() {
            params.pipe_sharing = enabled;
        }
        Ok(())
    }

    /// Queues the frame at `offset` in the buffer behind `fd` on every
    /// channel.
    pub fn queue_buffer(&mut self, fd: i32, offset: u64) -> Result<(), Error> {
        self.queue(&BufferDescriptor {
            memory: Memory::Fd(fd),
            offset,
            timestamp: None,
        })
    }

    /// Like [`queue_buffer`](Self::queue_buffer) with a presentation time.
    pub fn queue_buffer_at(
        &mut self,
        fd: i32,
        offset: u64,
        timestamp: Timestamp,
    ) -> Result<(), Error> {
        self.queue(&BufferDescriptor {
            memory: Memory::Fd(fd),
            offset,
            timestamp: Some(timestamp),
        })
    }

    pub fn queue(&mut self, buffer: &BufferDescriptor) -> Result<(), Error> {
        self.ensure_configured()?;
        for ch in self.channels.iter_mut().flatten() {
            ch.queue_buffer(&mut self.driver, buffer)?;
        }
        log::trace!("queued {:?} at 0x{:x}", buffer.memory, buffer.offset);
        Ok(())
    }

    /// Closes every channel and returns to [`DisplayState::UiMirror`].
    pub fn teardown(&mut self) {
        let previous = self.state;
        self.close_channels();
        self.reset();
        self.notify(previous, DisplayState::UiMirror);
        if previous != DisplayState::UiMirror {
            log::info!("{} -> {}", previous, DisplayState::UiMirror);
        }
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    /// Source of the current configuration, `None` while idle.
    pub fn source(&self) -> Option<&SourceParams> {
        self.source.as_ref()
    }

    /// Output layout of the current configuration.
    pub fn output(&self) -> OutputLayout {
        self.output
    }

    pub fn crop(&self) -> Rect {
        self.crop
    }

    pub fn position(&self) -> Option<Rect> {
        self.position
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Live channels in index order.
    pub fn channels(&self) -> impl Iterator<Item = &OverlayChannel> {
        self.channels.iter().flatten()
    }

    pub fn channel(&self, index: usize) -> Option<&OverlayChannel> {
        self.channels.get(index).and_then(Option::as_ref)
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn capabilities(&self) -> &C {
        &self.caps
    }

    pub fn capabilities_mut(&mut self) -> &mut C {
        &mut self.caps
    }

    fn resolve_state(&self, format: Format3D) -> DisplayState {
        target_state(&self.caps, format)
    }

    fn rebuild(&mut self, params: SourceParams, state: DisplayState) -> Result<(), Error> {
        let previous = self.state;
        self.close_channels();

        match self.open_channels(&params, state) {
            Ok(()) => {
                log::info!(
                    "{} -> {}: {}x{} {} {} ({} channels)",
                    previous,
                    state,
                    params.width,
                    params.height,
                    params.format,
                    params.format_3d,
                    self.channels().count()
                );
                self.state = state;
                self.source = Some(params);
                self.retry = None;
                self.notify(previous, state);
                Ok(())
            }
            Err(err) => {
                log::warn!("{} setup failed, back to {}: {}", state, DisplayState::UiMirror, err);
                self.close_channels();
                self.reset();
                if err.is_recoverable() || matches!(err, Error::ResourceExhausted(_)) {
                    self.retry = Some(params);
                }
                self.notify(previous, DisplayState::UiMirror);
                Err(err)
            }
        }
    }

    fn open_channels(&mut self, params: &SourceParams, state: DisplayState) -> Result<(), Error> {
        self.input = params.format_3d.input();
        self.output = output_layout(state, params.format_3d);
        self.transform = params.transform;
        self.crop = params.size().to_rect();

        for &(index, display) in channel_plan(state) {
            let bounds = self.driver.display_size(display)?;
            let target = self.place(index, display, bounds)?;
            let config = ChannelConfig {
                source: params.size(),
                format: params.format,
                transform: params.transform,
                rotator_buffers: params.rotator_buffers,
                pipe_sharing: params.pipe_sharing,
                eye: target.eye,
            };
            let limits = self.config.limits;
            let channel = OverlayChannel::configure(&mut self.driver, index, display, config, limits)?;
            let channel = self.channels[index].insert(channel);
            channel.set_crop(&mut self.driver, target.source)?;
            channel.set_position(&mut self.driver, target.dest)?;
        }
        Ok(())
    }

    /// Geometry of channel `index` on `display` for the current crop,
    /// position and transform.
    fn place(
        &self,
        index: usize,
        display: DisplayId,
        bounds: Size,
    ) -> Result<ChannelGeometry, Error> {
        let full = match display {
            DisplayId::Panel => self.position.unwrap_or_else(|| bounds.to_rect()),
            DisplayId::External => bounds.to_rect(),
        };
        let mut target = split(self.input, self.output, self.crop, full, index)?;
        if display == DisplayId::External && !self.output.is_stereo() && self.config.external_fit {
            target.dest = fit_aspect(self.transform.apply_to_size(target.source.size()), bounds);
        }
        Ok(target)
    }

    /// Pushes the current crop and position to every channel.
    fn apply_geometry(&mut self) -> Result<(), Error> {
        let targets = self
            .channels()
            .map(|ch| self.place(ch.index(), ch.display(), ch.bounds()))
            .collect::<Result<Vec<_>, _>>()?;

        for (ch, target) in self.channels.iter_mut().flatten().zip(targets) {
            if ch.source_crop() != target.source {
                ch.set_crop(&mut self.driver, target.source)?;
            }
            if ch.requested_dest() != target.dest {
                ch.set_position(&mut self.driver, target.dest)?;
            }
        }
        Ok(())
    }

    fn restore_geometry(&mut self) {
        if let Err(err) = self.apply_geometry() {
            log::warn!("failed to restore channel geometry: {}", err);
        }
    }

    fn apply_transform(&mut self) -> Result<(), Error> {
        for ch in self.channels.iter_mut().flatten() {
            ch.set_rotation(&mut self.driver, self.transform)?;
        }
        self.apply_geometry()
    }

    fn apply_pipe_sharing(&mut self, enabled: bool) -> Result<(), Error> {
        for ch in self.channels.iter_mut().flatten() {
            ch.set_pipe_sharing(&mut self.driver, enabled)?;
        }
        Ok(())
    }

    fn ensure_configured(&self) -> Result<(), Error> {
        if self.channels.iter().all(Option::is_none) {
            return Err(Error::NotConfigured);
        }
        Ok(())
    }

    fn close_channels(&mut self) {
        for slot in self.channels.iter_mut() {
            if let Some(ch) = slot.take() {
                ch.close(&mut self.driver);
            }
        }
    }

    fn reset(&mut self) {
        self.state = DisplayState::UiMirror;
        self.source = None;
        self.retry = None;
        self.input = InputLayout::None;
        self.output = OutputLayout::None;
        self.transform = Transform::Identity;
        self.crop = Rect::default();
    }

    fn barrier_orientation(&self) -> BarrierOrientation {
        if self.transform.swaps_axes() {
            BarrierOrientation::Portrait
        } else {
            BarrierOrientation::Landscape
        }
    }

    /// Best-effort notifications of a state change.
    fn notify(&mut self, previous: DisplayState, next: DisplayState) {
        if next == DisplayState::ThreeDOnExternal3DOut {
            let bits = self.output.announce_bits();
            if let Err(err) = self.caps.announce_output_3d_format(bits) {
                log::warn!("failed to announce 3D output format {}: {}", bits, err);
            }
        } else if previous == DisplayState::ThreeDOnExternal3DOut {
            if let Err(err) = self.caps.announce_output_3d_format(0) {
                log::warn!("failed to clear 3D output format: {}", err);
            }
        }

        if next == DisplayState::ThreeDOnPanel3DOut {
            self.set_barrier(self.barrier_orientation());
        } else if previous == DisplayState::ThreeDOnPanel3DOut {
            self.set_barrier(BarrierOrientation::Off);
        }
    }

    fn set_barrier(&mut self, orientation: BarrierOrientation) {
        if let Err(err) = self.caps.set_barrier_orientation(orientation) {
            log::warn!("failed to set barrier {:?}: {}", orientation, err);
        }
    }
}

impl<D: DisplayDriver, C: Capabilities> Drop for Overlay<D, C> {
    fn drop(&mut self) {
        self.close_channels();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::StaticCapabilities;
    use crate::sim::SimulatedDriver;
    use crate::stereo::Eye;

    fn panel_only() -> Overlay<SimulatedDriver, StaticCapabilities> {
        Overlay::new(
            SimulatedDriver::new((1280, 800), None),
            StaticCapabilities::default(),
        )
    }

    fn source() -> SourceParams {
        SourceParams::new(1280, 720, ColorFormat::NV12)
    }

    #[test]
    fn test_construction_opens_nothing() {
        let ov = panel_only();
        assert_eq!(ov.state(), DisplayState::UiMirror);
        assert_eq!(ov.driver().open_pipes(), 0);
        assert!(ov.source().is_none());
    }

    #[test]
    fn test_operations_need_a_source() {
        let mut ov = panel_only();
        assert!(matches!(ov.queue_buffer(3, 0), Err(Error::NotConfigured)));
        assert!(matches!(
            ov.set_position(Rect::new(0, 0, 100, 100)),
            Err(Error::NotConfigured)
        ));
        assert!(matches!(
            ov.set_crop(Rect::new(0, 0, 100, 100)),
            Err(Error::NotConfigured)
        ));
        assert!(matches!(
            ov.set_parameter(Parameter::Transform(Transform::Rot90)),
            Err(Error::NotConfigured)
        ));
    }

    #[test]
    fn test_2d_on_panel() {
        let mut ov = panel_only();
        ov.set_source(source()).unwrap();
        assert_eq!(ov.state(), DisplayState::TwoDOnPanel);
        let ch = ov.channel(0).unwrap();
        assert_eq!(ch.display(), DisplayId::Panel);
        assert_eq!(ch.crop(), Rect::new(0, 0, 1280, 720));
        assert_eq!(ch.dest(), Rect::new(0, 0, 1280, 800));
        assert_eq!(ch.eye(), None);
        assert!(ov.channel(1).is_none());

        ov.queue_buffer(3, 0).unwrap();
        assert_eq!(ov.driver().frames_submitted(), 1);
    }

    #[test]
    fn test_same_source_does_not_rebuild() {
        let mut ov = panel_only();
        ov.set_source(source()).unwrap();
        let commits = ov.driver().commits();
        ov.set_source(source()).unwrap();
        assert_eq!(ov.driver().commits(), commits);

        ov.set_source(SourceParams::new(640, 480, ColorFormat::NV12)).unwrap();
        assert!(ov.driver().commits() > commits);
        assert_eq!(ov.driver().open_pipes(), 1);
    }

    #[test]
    fn test_2d_on_external_mirrors_on_both_displays() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), Some((1920, 1080))),
            StaticCapabilities::with_external(false),
        );
        ov.set_source(SourceParams::new(640, 480, ColorFormat::NV12)).unwrap();
        assert_eq!(ov.state(), DisplayState::TwoDOnExternal);

        assert_eq!(ov.channel(0).unwrap().display(), DisplayId::Panel);
        let ext = ov.channel(1).unwrap();
        assert_eq!(ext.display(), DisplayId::External);
        // 4:3 letterboxed on 16:9
        assert_eq!(ext.dest(), Rect::new(240, 0, 1440, 1080));

        // panel placement does not move the external channel
        ov.set_position(Rect::new(100, 100, 320, 240)).unwrap();
        assert_eq!(ov.channel(0).unwrap().dest(), Rect::new(100, 100, 320, 240));
        assert_eq!(ov.channel(1).unwrap().dest(), Rect::new(240, 0, 1440, 1080));
    }

    #[test]
    fn test_panel_3d_uses_barrier() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), None),
            StaticCapabilities::with_3d_panel(),
        );
        let params = source().with_format_3d(Format3D::new(InputLayout::TopBottom, OutputLayout::None));
        ov.set_source(params).unwrap();
        assert_eq!(ov.state(), DisplayState::ThreeDOnPanel3DOut);
        assert_eq!(ov.output(), OutputLayout::SideBySide);
        assert_eq!(ov.channel(0).unwrap().dest(), Rect::new(0, 0, 640, 800));
        assert_eq!(ov.channel(0).unwrap().eye(), Some(Eye::Left));
        assert_eq!(ov.channel(1).unwrap().dest(), Rect::new(640, 0, 640, 800));
        assert_eq!(ov.channel(1).unwrap().eye(), Some(Eye::Right));

        ov.set_transform(Transform::Rot90).unwrap();
        ov.teardown();
        assert_eq!(
            ov.capabilities().barrier,
            vec![
                BarrierOrientation::Landscape,
                BarrierOrientation::Portrait,
                BarrierOrientation::Off
            ]
        );
    }

    #[test]
    fn test_monoscopic_request_keeps_panel_2d() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), None),
            StaticCapabilities::with_3d_panel(),
        );
        let format = Format3D::new(InputLayout::SideBySideLR, OutputLayout::Monoscopic);
        ov.set_source(source().with_format_3d(format)).unwrap();
        assert_eq!(ov.state(), DisplayState::ThreeDOnPanel2DOut);
        assert!(ov.capabilities().barrier.is_empty());
    }

    #[test]
    fn test_interleaved_output_is_unsupported() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), Some((1920, 1080))),
            StaticCapabilities::with_external(true),
        );
        let format = Format3D::new(InputLayout::Interleaved, OutputLayout::None);
        let err = ov.set_source(source().with_format_3d(format)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLayout(_)));
        assert_eq!(ov.state(), DisplayState::UiMirror);
        assert_eq!(ov.driver().open_pipes(), 0);
    }

    #[test]
    fn test_crop_is_split_per_eye() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), None),
            StaticCapabilities::with_3d_panel(),
        );
        let format = Format3D::new(InputLayout::SideBySideLR, OutputLayout::None);
        ov.set_source(source().with_format_3d(format)).unwrap();
        ov.set_crop(Rect::new(0, 0, 1280, 360)).unwrap();
        assert_eq!(ov.channel(0).unwrap().source_crop(), Rect::new(0, 0, 640, 360));
        assert_eq!(ov.channel(1).unwrap().source_crop(), Rect::new(640, 0, 640, 360));

        assert!(matches!(
            ov.set_crop(Rect::new(0, 0, 1400, 720)),
            Err(Error::InvalidGeometry(_))
        ));
        assert_eq!(ov.crop(), Rect::new(0, 0, 1280, 360));
    }

    #[test]
    fn test_failed_position_restores_channels() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), None),
            StaticCapabilities::with_3d_panel(),
        );
        let format = Format3D::new(InputLayout::SideBySideLR, OutputLayout::None);
        ov.set_source(source().with_format_3d(format)).unwrap();
        let before: Vec<Rect> = ov.channels().map(|ch| ch.dest()).collect();

        // the second channel commit fails, the first is rolled back
        ov.driver_mut().fail_commit_once(1);
        assert!(ov.set_position(Rect::new(0, 0, 640, 400)).is_err());
        let after: Vec<Rect> = ov.channels().map(|ch| ch.dest()).collect();
        assert_eq!(before, after);
        assert_eq!(before[0], Rect::new(0, 0, 640, 800));
        assert_eq!(ov.position(), None);
    }

    #[test]
    fn test_pipe_sharing_parameter() {
        let mut ov = panel_only();
        ov.set_source(source()).unwrap();
        ov.set_parameter(Parameter::PipeSharing(true)).unwrap();
        assert!(ov.channel(0).unwrap().pipe_sharing());
        assert!(ov.source().unwrap().pipe_sharing);
    }

    #[test]
    fn test_failed_pipe_sharing_is_rolled_back() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), Some((1920, 1080))),
            StaticCapabilities::with_external(false),
        );
        ov.set_source(source()).unwrap();
        assert_eq!(ov.channels().count(), 2);

        ov.driver_mut().fail_commit_once(1);
        assert!(ov.set_pipe_sharing(true).is_err());
        assert!(ov.channels().all(|ch| !ch.pipe_sharing()));
        assert!(!ov.source().unwrap().pipe_sharing);
    }

    #[test]
    fn test_refresh_follows_hotplug() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), None),
            StaticCapabilities::default(),
        );
        assert_eq!(ov.refresh().unwrap(), DisplayState::UiMirror);
        ov.set_source(source()).unwrap();
        assert_eq!(ov.state(), DisplayState::TwoDOnPanel);

        ov.driver_mut().set_external(Some((1920, 1080)));
        ov.capabilities_mut().external_connected = true;
        assert_eq!(ov.refresh().unwrap(), DisplayState::TwoDOnExternal);
        assert_eq!(ov.driver().open_pipes(), 2);

        ov.driver_mut().set_external(None);
        ov.capabilities_mut().external_connected = false;
        assert_eq!(ov.refresh().unwrap(), DisplayState::TwoDOnPanel);
        assert_eq!(ov.driver().open_pipes(), 1);
    }

    #[test]
    fn test_refresh_retries_failed_rebuild() {
        let mut ov = Overlay::new(
            SimulatedDriver::new((1280, 800), None),
            StaticCapabilities::default(),
        );
        ov.set_source(source()).unwrap();

        ov.driver_mut().set_external(Some((1920, 1080)));
        ov.capabilities_mut().external_connected = true;
        ov.driver_mut().fail_open_after(1);
        assert!(ov.refresh().unwrap_err().is_device_error());
        assert_eq!(ov.state(), DisplayState::UiMirror);
        assert!(ov.source().is_none());
        assert_eq!(ov.driver().open_pipes(), 0);

        // still failing, the source is kept for the next event
        assert!(ov.refresh().is_err());

        ov.driver_mut().clear_faults();
        assert_eq!(ov.refresh().unwrap(), DisplayState::TwoDOnExternal);
        assert_eq!(ov.source(), Some(&source()));
        assert_eq!(ov.driver().open_pipes(), 2);
    }

    #[test]
    fn test_failed_layout_is_not_retried() {
        let mut ov = panel_only();
        let format = Format3D::new(InputLayout::Interleaved, OutputLayout::None);
        assert!(ov.set_source(source().with_format_3d(format)).is_err());
        assert_eq!(ov.refresh().unwrap(), DisplayState::UiMirror);
        assert_eq!(ov.driver().open_pipes(), 0);
    }

    #[test]
    fn test_teardown_drops_retry() {
        let mut ov = panel_only();
        ov.driver_mut().fail_open_after(0);
        assert!(ov.set_source(source()).is_err());
        ov.driver_mut().clear_faults();
        ov.teardown();
        assert_eq!(ov.refresh().unwrap(), DisplayState::UiMirror);
        assert_eq!(ov.driver().open_pipes(), 0);
    }

    #[test]
    fn test_plan_covers_every_state() {
        assert!(channel_plan(DisplayState::UiMirror).is_empty());
        for state in [
            DisplayState::ThreeDOnPanel2DOut,
            DisplayState::ThreeDOnExternal2DOut,
        ] {
            assert_eq!(channel_plan(state).len(), 1);
            assert_eq!(channel_plan(state)[0].0, 1);
            assert_eq!(output_layout(state, Format3D::NONE), OutputLayout::Monoscopic);
        }
    }
}
