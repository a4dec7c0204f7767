// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use crate::setup::{PlanReport, SetupArgs};
use crate::utils;
use clap::Args as ClapArgs;
use overlay::transform::Transform;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};
use unix_ts::Timestamp;

/// Transforms cycled through by `--rotate-every`.
const ROTATION_CYCLE: [Transform; 4] = [
    Transform::Rot90,
    Transform::Rot180,
    Transform::Rot270,
    Transform::Identity,
];

#[derive(ClapArgs, Debug)]
pub struct Args {
    #[command(flatten)]
    setup: SetupArgs,

    /// Number of frames to queue (0 = until Ctrl+C)
    #[arg(short = 'n', long, default_value = "300")]
    frames: u64,

    /// Change the transform every N frames (0 = never)
    #[arg(long, default_value = "0")]
    rotate_every: u64,

    /// Delay between frames in milliseconds
    #[arg(long, default_value = "0")]
    interval_ms: u64,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    plan: PlanReport,
    frames_queued: u64,
    transform_changes: u64,
    frames_submitted: u64,
    rotations: u64,
    commits: u64,
    elapsed_ms: u128,
    interrupted: bool,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing simulate command: {:?}", args);

    // Install signal handler for graceful shutdown
    let term = utils::install_signal_handler()?;

    let mut ov = args.setup.build()?;
    log::info!(
        "Simulating {} on {} channel(s)",
        ov.state(),
        ov.channels().count()
    );

    let frame_size = ov
        .source()
        .and_then(|s| s.format.frame_size(s.width as u32, s.height as u32))
        .unwrap_or(0);
    let max_frames = if args.frames == 0 {
        u64::MAX
    } else {
        args.frames
    };

    let start = Instant::now();
    let mut frame_count = 0u64;
    let mut transform_changes = 0u64;

    while frame_count < max_frames && !term.load(Ordering::Relaxed) {
        if args.rotate_every > 0 && frame_count > 0 && frame_count % args.rotate_every == 0 {
            let next = ROTATION_CYCLE[(transform_changes % ROTATION_CYCLE.len() as u64) as usize];
            ov.set_transform(next)?;
            transform_changes += 1;
            log::debug!("Frame {}: transform {}", frame_count, next);
        }

        let elapsed = start.elapsed();
        let timestamp = Timestamp::new(elapsed.as_secs() as i64, elapsed.subsec_nanos());
        // four source buffers back to back in one allocation
        ov.queue_buffer_at(0, (frame_count % 4) * frame_size, timestamp)?;
        frame_count += 1;

        if args.interval_ms > 0 {
            thread::sleep(Duration::from_millis(args.interval_ms));
        }
    }

    let interrupted = term.load(Ordering::Relaxed);
    if interrupted {
        log::info!("Received Ctrl+C, stopping after {} frames", frame_count);
    }

    let report = SimulationReport {
        plan: PlanReport::of(&ov),
        frames_queued: frame_count,
        transform_changes,
        frames_submitted: ov.driver().frames_submitted(),
        rotations: ov.driver().rotations(),
        commits: ov.driver().commits(),
        elapsed_ms: start.elapsed().as_millis(),
        interrupted,
    };
    ov.teardown();

    if json {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::General(format!("Failed to serialize JSON: {}", e)))?;
        println!("{}", json_str);
    } else {
        report.plan.print_text();
        println!();
        println!("Frames queued:     {}", report.frames_queued);
        println!("Transform changes: {}", report.transform_changes);
        println!("Frames submitted:  {}", report.frames_submitted);
        println!("Rotations:         {}", report.rotations);
        println!("Commits:           {}", report.commits);
        println!("Elapsed:           {} ms", report.elapsed_ms);
    }

    Ok(())
}
