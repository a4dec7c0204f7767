// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use crate::utils;
use clap::Args as ClapArgs;
use overlay::capabilities::{Capabilities, FileCapabilities};
use overlay::overlay::target_state;
use overlay::stereo::Format3D;
use serde::Serialize;
use std::path::PathBuf;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Overlay configuration file (JSON) naming the capability files
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stereo input layout of the content to resolve for
    #[arg(long, default_value = "none")]
    input: String,

    /// Stereo output layout of the content to resolve for
    #[arg(long, default_value = "none")]
    output: String,
}

#[derive(Debug, Serialize)]
struct ProbeInfo {
    external_connected: bool,
    external_3d: bool,
    panel_3d: bool,
    prefers_panel_3d: bool,
    format_3d: u32,
    state: &'static str,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing probe command: {:?}", args);

    let config = utils::load_config(args.config.as_deref())?;
    let input = utils::parse_input_layout(&args.input)?;
    let output = utils::parse_output_layout(&args.output)?;
    let format = Format3D::new(input, output);

    let caps = FileCapabilities::new(config.capabilities);
    let info = ProbeInfo {
        external_connected: caps.is_external_connected(),
        external_3d: caps.external_supports_3d(),
        panel_3d: caps.panel_is_3d_capable(),
        prefers_panel_3d: caps.user_prefers_panel_3d(),
        format_3d: format.bits(),
        state: target_state(&caps, format).name(),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&info)
            .map_err(|e| CliError::General(format!("Failed to serialize JSON: {}", e)))?;
        println!("{}", json_str);
    } else {
        let paths = caps.paths();
        println!("External connected: {} ({})", info.external_connected, paths.external_connected.display());
        println!("External 3D:        {} ({})", info.external_3d, paths.external_3d_capable.display());
        println!("Panel 3D:           {} ({})", info.panel_3d, paths.panel_3d_capable.display());
        println!("Prefers panel 3D:   {} ({})", info.prefers_panel_3d, paths.user_prefers_panel_3d.display());
        println!("Format 3D:          0x{:05x}", info.format_3d);
        println!("State:              {}", info.state);
    }

    Ok(())
}
