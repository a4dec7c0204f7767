// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use serde::Serialize;
use std::fmt;

/// Which display shows the video and how many eyes reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DisplayState {
    /// No video overlay; the UI framebuffer is mirrored as-is.
    #[default]
    UiMirror,
    TwoDOnPanel,
    TwoDOnExternal,
    ThreeDOnPanel2DOut,
    ThreeDOnPanel3DOut,
    ThreeDOnExternal2DOut,
    ThreeDOnExternal3DOut,
}

impl DisplayState {
    pub fn name(&self) -> &'static str {
        match self {
            DisplayState::UiMirror => "UI_MIRROR",
            DisplayState::TwoDOnPanel => "2D_ON_PANEL",
            DisplayState::TwoDOnExternal => "2D_ON_EXTERNAL",
            DisplayState::ThreeDOnPanel2DOut => "3D_ON_PANEL_2D_OUT",
            DisplayState::ThreeDOnPanel3DOut => "3D_ON_PANEL_3D_OUT",
            DisplayState::ThreeDOnExternal2DOut => "3D_ON_EXTERNAL_2D_OUT",
            DisplayState::ThreeDOnExternal3DOut => "3D_ON_EXTERNAL_3D_OUT",
        }
    }

    /// True when the video is scanned out on the external display.
    pub fn uses_external(&self) -> bool {
        matches!(
            self,
            DisplayState::TwoDOnExternal
                | DisplayState::ThreeDOnExternal2DOut
                | DisplayState::ThreeDOnExternal3DOut
        )
    }

    /// True when both eyes reach the viewer.
    pub fn is_stereo_output(&self) -> bool {
        matches!(
            self,
            DisplayState::ThreeDOnPanel3DOut | DisplayState::ThreeDOnExternal3DOut
        )
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Picks the display state for a video source.
///
/// An external display always takes priority over the built-in panel. With
/// stereo content on an external display its 3D capability decides whether
/// both eyes are sent; without one the panel preference decides.
///
/// ```
/// use overlay::state::{resolve, DisplayState};
///
/// assert_eq!(resolve(true, true, true, false), DisplayState::ThreeDOnExternal3DOut);
/// assert_eq!(resolve(true, false, false, false), DisplayState::ThreeDOnPanel2DOut);
/// assert_eq!(resolve(false, false, false, true), DisplayState::TwoDOnPanel);
/// ```
pub fn resolve(
    has_s3d_content: bool,
    external_connected: bool,
    external_is_3d_capable: bool,
    prefer_panel_3d: bool,
) -> DisplayState {
    let state = if external_connected {
        match (has_s3d_content, external_is_3d_capable) {
            (true, true) => DisplayState::ThreeDOnExternal3DOut,
            (true, false) => DisplayState::ThreeDOnExternal2DOut,
            (false, _) => DisplayState::TwoDOnExternal,
        }
    } else if has_s3d_content {
        if prefer_panel_3d {
            DisplayState::ThreeDOnPanel3DOut
        } else {
            DisplayState::ThreeDOnPanel2DOut
        }
    } else {
        DisplayState::TwoDOnPanel
    };

    log::debug!(
        "resolve(s3d={}, external={}, external_3d={}, panel_3d={}) -> {}",
        has_s3d_content,
        external_connected,
        external_is_3d_capable,
        prefer_panel_3d,
        state
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_truth_table() {
        for s3d in [false, true] {
            for ext in [false, true] {
                for ext3d in [false, true] {
                    for panel in [false, true] {
                        let expected = match (s3d, ext, ext3d, panel) {
                            (false, true, _, _) => DisplayState::TwoDOnExternal,
                            (true, true, true, _) => DisplayState::ThreeDOnExternal3DOut,
                            (true, true, false, _) => DisplayState::ThreeDOnExternal2DOut,
                            (true, false, _, true) => DisplayState::ThreeDOnPanel3DOut,
                            (true, false, _, false) => DisplayState::ThreeDOnPanel2DOut,
                            (false, false, _, _) => DisplayState::TwoDOnPanel,
                        };
                        assert_eq!(resolve(s3d, ext, ext3d, panel), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_external_priority_over_panel_preference() {
        assert_eq!(resolve(true, true, false, true), DisplayState::ThreeDOnExternal2DOut);
        assert_eq!(resolve(false, true, true, true), DisplayState::TwoDOnExternal);
    }

    #[test]
    fn test_state_predicates() {
        assert!(DisplayState::TwoDOnExternal.uses_external());
        assert!(!DisplayState::ThreeDOnPanel3DOut.uses_external());
        assert!(DisplayState::ThreeDOnPanel3DOut.is_stereo_output());
        assert!(!DisplayState::ThreeDOnExternal2DOut.is_stereo_output());
        assert_eq!(DisplayState::default(), DisplayState::UiMirror);
        assert_eq!(format!("{}", DisplayState::ThreeDOnPanel2DOut), "3D_ON_PANEL_2D_OUT");
    }
}
