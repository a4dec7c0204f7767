// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use clap::Args as ClapArgs;
use overlay::state::resolve;
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// The source carries stereoscopic content
    #[arg(long)]
    stereo: bool,

    /// An external display is connected
    #[arg(long)]
    external: bool,

    /// The external display accepts 3D formats
    #[arg(long)]
    external_3d: bool,

    /// Show 3D content in 3D on the panel
    #[arg(long)]
    panel_3d: bool,
}

#[derive(Debug, Serialize)]
struct Resolution {
    stereo: bool,
    external: bool,
    external_3d: bool,
    panel_3d: bool,
    state: &'static str,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing resolve command: {:?}", args);

    let state = resolve(args.stereo, args.external, args.external_3d, args.panel_3d);
    let result = Resolution {
        stereo: args.stereo,
        external: args.external,
        external_3d: args.external_3d,
        panel_3d: args.panel_3d,
        state: state.name(),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::General(format!("Failed to serialize JSON: {}", e)))?;
        println!("{}", json_str);
    } else {
        println!("{}", result.state);
    }

    Ok(())
}
