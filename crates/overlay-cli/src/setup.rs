// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Source and display arguments shared by `plan` and `simulate`.

use crate::error::CliError;
use crate::utils;
use clap::Args as ClapArgs;
use overlay::capabilities::StaticCapabilities;
use overlay::channel::OverlayChannel;
use overlay::driver::DisplayId;
use overlay::geometry::Rect;
use overlay::overlay::{Overlay, SourceParams};
use overlay::sim::SimulatedDriver;
use overlay::stereo::{Eye, Format3D, OutputLayout};
use overlay::transform::Transform;
use serde::Serialize;
use std::path::PathBuf;

pub type SimOverlay = Overlay<SimulatedDriver, StaticCapabilities>;

#[derive(ClapArgs, Debug)]
pub struct SetupArgs {
    /// Source resolution (WxH)
    #[arg(short, long, default_value = "1280x720")]
    source: String,

    /// Source pixel format (FOURCC)
    #[arg(short, long, default_value = "NV12")]
    format: String,

    /// Stereo input layout: none, sbs-lr, sbs-rl, tb, interleaved
    #[arg(long, default_value = "none")]
    input: String,

    /// Stereo output layout: none, sbs, tb, interleaved, mono
    #[arg(long, default_value = "none")]
    output: String,

    /// Panel resolution (WxH)
    #[arg(long, default_value = "1280x800")]
    panel: String,

    /// Connected external display resolution (WxH)
    #[arg(long)]
    external: Option<String>,

    /// The external display accepts 3D formats
    #[arg(long)]
    external_3d: bool,

    /// The panel is 3D capable and the user prefers 3D on it
    #[arg(long)]
    panel_3d: bool,

    /// Source transform: identity, flip-h, flip-v, 90, 180, 270, 90+flip-h, 90+flip-v
    #[arg(short, long, default_value = "identity")]
    transform: String,

    /// Route frames through a rotator ring with this many buffers
    #[arg(long)]
    rotator_buffers: Option<usize>,

    /// Source crop (X,Y,W,H)
    #[arg(long)]
    crop: Option<String>,

    /// Position on the panel (X,Y,W,H)
    #[arg(long)]
    position: Option<String>,

    /// Overlay configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl SetupArgs {
    /// Builds a simulated overlay and configures it for the source.
    pub fn build(&self) -> Result<SimOverlay, CliError> {
        let (width, height) = utils::parse_resolution(&self.source)?;
        let format = utils::parse_format(&self.format)?;
        let input = utils::parse_input_layout(&self.input)?;
        let output = utils::parse_output_layout(&self.output)?;
        let panel = utils::parse_resolution(&self.panel)?;
        let external = self
            .external
            .as_deref()
            .map(utils::parse_resolution)
            .transpose()?;
        let transform = utils::parse_transform(&self.transform)?;
        let crop = self.crop.as_deref().map(utils::parse_rect).transpose()?;
        let position = self.position.as_deref().map(utils::parse_rect).transpose()?;
        let config = utils::load_config(self.config.as_deref())?;

        if self.external_3d && external.is_none() {
            return Err(CliError::InvalidArgs(
                "--external-3d needs --external".to_string(),
            ));
        }

        let caps = StaticCapabilities {
            external_connected: external.is_some(),
            external_3d: self.external_3d,
            panel_3d: self.panel_3d,
            prefers_panel_3d: self.panel_3d,
            ..Default::default()
        };
        let driver = SimulatedDriver::new(panel, external);

        let mut params = SourceParams::new(width, height, format)
            .with_format_3d(Format3D::new(input, output))
            .with_transform(transform);
        if let Some(buffers) = self.rotator_buffers {
            params = params.with_rotator(buffers);
        }

        let mut ov = Overlay::with_config(driver, caps, config);
        ov.set_source(params)?;
        if let Some(position) = position {
            ov.set_position(position)?;
        }
        if let Some(crop) = crop {
            ov.set_crop(crop)?;
        }
        Ok(ov)
    }
}

#[derive(Debug, Serialize)]
pub struct ChannelReport {
    pub index: usize,
    pub display: DisplayId,
    pub pipe: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye: Option<Eye>,
    /// Crop in source coordinates
    pub source_crop: Rect,
    /// Crop in transformed coordinates
    pub crop: Rect,
    pub dest: Rect,
    pub transform: Transform,
    pub rotator: bool,
}

impl From<&OverlayChannel> for ChannelReport {
    fn from(ch: &OverlayChannel) -> Self {
        ChannelReport {
            index: ch.index(),
            display: ch.display(),
            pipe: ch.pipe().0,
            eye: ch.eye(),
            source_crop: ch.source_crop(),
            crop: ch.crop(),
            dest: ch.dest(),
            transform: ch.transform(),
            rotator: ch.rotator_session_open(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub state: String,
    pub output: OutputLayout,
    pub channels: Vec<ChannelReport>,
}

impl PlanReport {
    pub fn of(ov: &SimOverlay) -> Self {
        PlanReport {
            state: ov.state().name().to_string(),
            output: ov.output(),
            channels: ov.channels().map(ChannelReport::from).collect(),
        }
    }

    pub fn print_text(&self) {
        println!("State:   {}", self.state);
        println!("Output:  {:?}", self.output);
        for ch in &self.channels {
            println!();
            println!("Channel {} ({}, pipe {})", ch.index, ch.display, ch.pipe);
            if let Some(eye) = ch.eye {
                println!("  Eye:       {:?}", eye);
            }
            println!("  Source:    {}", ch.source_crop);
            println!("  Crop:      {}", ch.crop);
            println!("  Dest:      {}", ch.dest);
            println!("  Transform: {}", ch.transform);
            println!("  Rotator:   {}", if ch.rotator { "yes" } else { "no" });
        }
    }
}
