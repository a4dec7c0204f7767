// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use overlay::config::OverlayConfig;
use overlay::fourcc::ColorFormat;
use overlay::geometry::Rect;
use overlay::stereo::{InputLayout, OutputLayout};
use overlay::transform::Transform;
use signal_hook::consts::SIGINT;
use signal_hook::flag;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn parse_dimension(value: &str, what: &str, input: &str) -> Result<i32, CliError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid {} in resolution: {}", what, input)))
}

/// Parse resolution string in format "WxH" or "W*H"
pub fn parse_resolution(s: &str) -> Result<(i32, i32), CliError> {
    let (width_str, height_str) = s
        .split_once('x')
        .or_else(|| s.split_once('*'))
        .ok_or_else(|| {
            CliError::InvalidArgs(format!(
                "Invalid resolution format (expected WxH or W*H): {}",
                s
            ))
        })?;

    let width = parse_dimension(width_str, "width", s)?;
    let height = parse_dimension(height_str, "height", s)?;
    if width <= 0 || height <= 0 {
        return Err(CliError::InvalidArgs(format!(
            "Resolution dimensions must be positive: {}",
            s
        )));
    }
    Ok((width, height))
}

/// Parse rectangle string in format "X,Y,W,H"
pub fn parse_rect(s: &str) -> Result<Rect, CliError> {
    let fields = s
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid rectangle: {}", s)))?;

    match fields.as_slice() {
        &[x, y, w, h] if w > 0 && h > 0 => Ok(Rect::new(x, y, w, h)),
        &[_, _, _, _] => Err(CliError::InvalidArgs(format!(
            "Rectangle size must be positive: {}",
            s
        ))),
        _ => Err(CliError::InvalidArgs(format!(
            "Invalid rectangle format (expected X,Y,W,H): {}",
            s
        ))),
    }
}

/// Parse a FOURCC string the overlay pipes can scan out
pub fn parse_format(s: &str) -> Result<ColorFormat, CliError> {
    let format: ColorFormat = s.parse()?;
    if !format.is_supported() {
        return Err(CliError::InvalidArgs(format!(
            "Unsupported color format: {}",
            s
        )));
    }
    Ok(format)
}

/// Parse a stereo input layout name
pub fn parse_input_layout(s: &str) -> Result<InputLayout, CliError> {
    match s.to_lowercase().as_str() {
        "none" | "2d" => Ok(InputLayout::None),
        "sbs" | "sbs-lr" | "side-by-side" => Ok(InputLayout::SideBySideLR),
        "sbs-rl" => Ok(InputLayout::SideBySideRL),
        "tb" | "top-bottom" => Ok(InputLayout::TopBottom),
        "interleaved" => Ok(InputLayout::Interleaved),
        _ => Err(CliError::InvalidArgs(format!(
            "Invalid input layout (expected none, sbs-lr, sbs-rl, tb or interleaved): {}",
            s
        ))),
    }
}

/// Parse a stereo output layout name
pub fn parse_output_layout(s: &str) -> Result<OutputLayout, CliError> {
    match s.to_lowercase().as_str() {
        "none" | "auto" => Ok(OutputLayout::None),
        "sbs" | "side-by-side" => Ok(OutputLayout::SideBySide),
        "tb" | "top-bottom" => Ok(OutputLayout::TopBottom),
        "interleaved" => Ok(OutputLayout::Interleaved),
        "mono" | "monoscopic" | "2d" => Ok(OutputLayout::Monoscopic),
        _ => Err(CliError::InvalidArgs(format!(
            "Invalid output layout (expected none, sbs, tb, interleaved or mono): {}",
            s
        ))),
    }
}

pub fn parse_transform(s: &str) -> Result<Transform, CliError> {
    s.parse::<Transform>()
        .map_err(|e| CliError::InvalidArgs(e.to_string()))
}

/// Load the overlay configuration from a JSON file, or the defaults when
/// no file is given. Missing fields keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<OverlayConfig, CliError> {
    let path = match path {
        Some(path) => path,
        None => return Ok(OverlayConfig::default()),
    };

    let text = fs::read_to_string(path).map_err(|e| {
        CliError::InvalidArgs(format!("Cannot read config {}: {}", path.display(), e))
    })?;
    let config = serde_json::from_str(&text).map_err(|e| {
        CliError::InvalidArgs(format!("Invalid config {}: {}", path.display(), e))
    })?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Install signal handler for graceful shutdown on Ctrl+C
///
/// Returns an Arc<AtomicBool> that will be set to true when SIGINT is received.
pub fn install_signal_handler() -> Result<Arc<AtomicBool>, CliError> {
    let term = Arc::new(AtomicBool::new(false));

    flag::register(SIGINT, Arc::clone(&term))
        .map_err(|e| CliError::General(format!("Failed to register signal handler: {}", e)))?;

    log::debug!("Installed SIGINT handler");
    Ok(term)
}
