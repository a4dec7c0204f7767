// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hardware limits of the overlay pipes and rotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeLimits {
    /// Widest source a pipe can fetch
    pub max_source_width: i32,
    /// Tallest source a pipe can fetch
    pub max_source_height: i32,
    /// Largest destination/crop ratio per dimension
    pub max_magnification: i32,
    /// Smallest destination width or height a pipe can scan out
    pub min_dest_size: i32,
    /// Deepest rotator ring a channel may allocate
    pub max_rotator_buffers: usize,
}

impl Default for PipeLimits {
    fn default() -> Self {
        PipeLimits {
            max_source_width: 2048,
            max_source_height: 2048,
            max_magnification: 8,
            min_dest_size: 2,
            max_rotator_buffers: 8,
        }
    }
}

/// Locations of the capability files and notification sinks.
///
/// Flags are single-character files holding `1` or `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityPaths {
    pub external_connected: PathBuf,
    pub external_3d_capable: PathBuf,
    pub panel_3d_capable: PathBuf,
    pub user_prefers_panel_3d: PathBuf,
    pub output_3d_format: PathBuf,
    pub barrier_orientation: PathBuf,
}

impl Default for CapabilityPaths {
    fn default() -> Self {
        CapabilityPaths {
            external_connected: "/sys/class/graphics/fb1/connected".into(),
            external_3d_capable: "/sys/class/graphics/fb1/3d_present".into(),
            panel_3d_capable: "/sys/class/graphics/fb0/3d_present".into(),
            user_prefers_panel_3d: "/data/misc/display/panel_3d".into(),
            output_3d_format: "/sys/class/graphics/fb1/format_3d".into(),
            barrier_orientation: "/sys/devices/platform/mipi_panel.0/enable_3d_barrier".into(),
        }
    }
}

/// Complete overlay configuration. Every field has a default, so a partial
/// JSON document is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub limits: PipeLimits,
    pub capabilities: CapabilityPaths,
    /// Place external-display channels with an aspect-preserving fit
    /// instead of the caller's panel position.
    pub external_fit: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            limits: PipeLimits::default(),
            capabilities: CapabilityPaths::default(),
            external_fit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = OverlayConfig::default();
        assert_eq!(cfg.limits.max_magnification, 8);
        assert_eq!(cfg.limits.max_rotator_buffers, 8);
        assert!(cfg.external_fit);
    }
}
