// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use crate::setup::{PlanReport, SetupArgs};
use clap::Args as ClapArgs;

#[derive(ClapArgs, Debug)]
pub struct Args {
    #[command(flatten)]
    setup: SetupArgs,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing plan command: {:?}", args);

    let ov = args.setup.build()?;
    let report = PlanReport::of(&ov);

    if json {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::General(format!("Failed to serialize JSON: {}", e)))?;
        println!("{}", json_str);
    } else {
        report.print_text();
    }

    Ok(())
}
