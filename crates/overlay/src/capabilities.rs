// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Platform capability queries and one-way notifications.
//!
//! The overlay facade asks the platform whether an external display is
//! connected and what it and the panel can show, and tells it which 3D
//! format is being sent and how the panel's lenticular barrier should be
//! oriented. Notifications are best-effort: the facade logs a failure and
//! carries on.

use crate::config::CapabilityPaths;
use crate::Error;
use std::fs;
use std::path::Path;

/// Orientation of the panel's lenticular barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BarrierOrientation {
    #[default]
    Off,
    Landscape,
    Portrait,
}

impl BarrierOrientation {
    /// Value written to the barrier control.
    pub fn value(self) -> u32 {
        match self {
            BarrierOrientation::Off => 0,
            BarrierOrientation::Landscape => 1,
            BarrierOrientation::Portrait => 2,
        }
    }
}

/// Capability/config collaborator of the overlay facade.
pub trait Capabilities {
    fn is_external_connected(&self) -> bool;

    fn external_supports_3d(&self) -> bool;

    fn panel_is_3d_capable(&self) -> bool;

    fn user_prefers_panel_3d(&self) -> bool;

    /// Tells the external display which 3D output format follows.
    fn announce_output_3d_format(&mut self, bits: u32) -> Result<(), Error>;

    fn set_barrier_orientation(&mut self, orientation: BarrierOrientation) -> Result<(), Error>;
}

/// Capabilities backed by sysfs-style flag files.
#[derive(Debug, Clone)]
pub struct FileCapabilities {
    paths: CapabilityPaths,
}

impl FileCapabilities {
    pub fn new(paths: CapabilityPaths) -> Self {
        FileCapabilities { paths }
    }

    pub fn paths(&self) -> &CapabilityPaths {
        &self.paths
    }

    fn read_flag(path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(contents) => contents.trim() == "1",
            Err(err) => {
                log::debug!("{}: {}", path.display(), err);
                false
            }
        }
    }

    fn write_value(path: &Path, value: u32) -> Result<(), Error> {
        fs::write(path, format!("{}\n", value))?;
        Ok(())
    }
}

impl Default for FileCapabilities {
    fn default() -> Self {
        FileCapabilities::new(CapabilityPaths::default())
    }
}

impl Capabilities for FileCapabilities {
    fn is_external_connected(&self) -> bool {
        Self::read_flag(&self.paths.external_connected)
    }

    fn external_supports_3d(&self) -> bool {
        Self::read_flag(&self.paths.external_3d_capable)
    }

    fn panel_is_3d_capable(&self) -> bool {
        Self::read_flag(&self.paths.panel_3d_capable)
    }

    fn user_prefers_panel_3d(&self) -> bool {
        Self::read_flag(&self.paths.user_prefers_panel_3d)
    }

    fn announce_output_3d_format(&mut self, bits: u32) -> Result<(), Error> {
        Self::write_value(&self.paths.output_3d_format, bits)
    }

    fn set_barrier_orientation(&mut self, orientation: BarrierOrientation) -> Result<(), Error> {
        Self::write_value(&self.paths.barrier_orientation, orientation.value())
    }
}

/// Fixed capability values that record every notification.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities {
    pub external_connected: bool,
    pub external_3d: bool,
    pub panel_3d: bool,
    pub prefers_panel_3d: bool,
    /// Make every notification fail
    pub fail_notifications: bool,
    /// Announced output formats, oldest first
    pub announced: Vec<u32>,
    /// Barrier orientations set, oldest first
    pub barrier: Vec<BarrierOrientation>,
}

impl StaticCapabilities {
    /// Capabilities of a system with an external display attached.
    pub fn with_external(external_3d: bool) -> Self {
        StaticCapabilities {
            external_connected: true,
            external_3d,
            ..Default::default()
        }
    }

    /// Capabilities of a 3D panel the user wants to use in 3D.
    pub fn with_3d_panel() -> Self {
        StaticCapabilities {
            panel_3d: true,
            prefers_panel_3d: true,
            ..Default::default()
        }
    }
}

impl Capabilities for StaticCapabilities {
    fn is_external_connected(&self) -> bool {
        self.external_connected
    }

    fn external_supports_3d(&self) -> bool {
        self.external_3d
    }

    fn panel_is_3d_capable(&self) -> bool {
        self.panel_3d
    }

    fn user_prefers_panel_3d(&self) -> bool {
        self.prefers_panel_3d
    }

    fn announce_output_3d_format(&mut self, bits: u32) -> Result<(), Error> {
        if self.fail_notifications {
            return Err(Error::Device("format announcement rejected".to_string()));
        }
        self.announced.push(bits);
        Ok(())
    }

    fn set_barrier_orientation(&mut self, orientation: BarrierOrientation) -> Result<(), Error> {
        if self.fail_notifications {
            return Err(Error::Device("barrier control rejected".to_string()));
        }
        self.barrier.push(orientation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("overlay-caps-{}-{}", std::process::id(), name));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn paths_in(dir: &Path) -> CapabilityPaths {
        CapabilityPaths {
            external_connected: dir.join("connected"),
            external_3d_capable: dir.join("3d_present"),
            panel_3d_capable: dir.join("panel_3d_present"),
            user_prefers_panel_3d: dir.join("panel_3d"),
            output_3d_format: dir.join("format_3d"),
            barrier_orientation: dir.join("barrier"),
        }
    }

    #[test]
    fn test_file_flags() {
        let dir = scratch_dir("flags");
        let paths = paths_in(&dir);
        fs::write(&paths.external_connected, "1\n").unwrap();
        fs::write(&paths.external_3d_capable, "0").unwrap();

        let caps = FileCapabilities::new(paths);
        assert!(caps.is_external_connected());
        assert!(!caps.external_supports_3d());
        // missing files read as false
        assert!(!caps.panel_is_3d_capable());
        assert!(!caps.user_prefers_panel_3d());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_file_notifications() {
        let dir = scratch_dir("notify");
        let mut caps = FileCapabilities::new(paths_in(&dir));
        caps.announce_output_3d_format(2).unwrap();
        caps.set_barrier_orientation(BarrierOrientation::Portrait).unwrap();
        assert_eq!(fs::read_to_string(dir.join("format_3d")).unwrap(), "2\n");
        assert_eq!(fs::read_to_string(dir.join("barrier")).unwrap(), "2\n");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_file_notification_failure_is_reported() {
        let dir = scratch_dir("missing");
        let mut paths = paths_in(&dir);
        paths.output_3d_format = dir.join("no-such-dir").join("format_3d");
        let mut caps = FileCapabilities::new(paths);
        assert!(matches!(caps.announce_output_3d_format(1), Err(Error::Io(_))));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_static_records() {
        let mut caps = StaticCapabilities::with_3d_panel();
        caps.set_barrier_orientation(BarrierOrientation::Landscape).unwrap();
        assert_eq!(caps.barrier, vec![BarrierOrientation::Landscape]);
        caps.fail_notifications = true;
        assert!(caps.announce_output_3d_format(1).is_err());
        assert!(caps.announced.is_empty());
    }
}
