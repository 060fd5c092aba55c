//! Engine tuning values and their defaults.
//!
//! Every field of [`EngineConfig`] may be omitted from a configuration file;
//! missing fields take the constants below.

use serde::Deserialize;

/// Radius within which a committed part claims its nearest cell.
pub const OCCUPANCY_RADIUS: f32 = 0.4;
/// Highlight search radius for full-shaped pieces.
pub const HIGHLIGHT_RADIUS: f32 = 1.1;
// corner pieces sit off-centre, so they search slightly wider
/// Highlight search radius for corner-shaped pieces.
pub const CORNER_HIGHLIGHT_RADIUS: f32 = 1.2;
/// Radius used to find the board a pressed piece rests on.
pub const SOURCE_LOOKUP_RADIUS: f32 = 1.0;

/// Seconds a successful drop takes to settle.
pub const SNAP_DURATION: f32 = 0.3;
/// Seconds a rejected drop takes to fly back.
pub const RETURN_DURATION: f32 = 0.25;

/// Depth change applied to a piece when it is picked up.
pub const DRAG_LIFT: f32 = -1.0;
/// Depth offset between a resting piece and its board plane.
pub const RESTING_OFFSET: f32 = -0.005;
/// Depth of the plane pointer rays are projected onto.
pub const DRAG_PLANE_DEPTH: f32 = 0.0;

/// Distance between neighbouring cell centres.
pub const CELL_SPACING: f32 = 1.0;
/// Default horizontal distance between board origins.
pub const BOARD_SPACING_HORIZONTAL: f32 = 4.0;
/// Default vertical distance between board rows.
pub const BOARD_SPACING_VERTICAL: f32 = 4.0;

/// Seconds the level timer stays suspended after a stage loads.
pub const STAGE_RESUME_DELAY: f32 = 1.5;

/// Runtime configuration shared by the session, controller and director.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub occupancy_radius: f32,
    pub highlight_radius: f32,
    pub corner_highlight_radius: f32,
    pub source_lookup_radius: f32,
    pub snap_duration: f32,
    pub return_duration: f32,
    pub drag_lift: f32,
    pub resting_offset: f32,
    pub drag_plane_depth: f32,
    pub cell_spacing: f32,
    pub board_spacing_horizontal: f32,
    pub board_spacing_vertical: f32,
    pub stage_resume_delay: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            occupancy_radius: OCCUPANCY_RADIUS,
            highlight_radius: HIGHLIGHT_RADIUS,
            corner_highlight_radius: CORNER_HIGHLIGHT_RADIUS,
            source_lookup_radius: SOURCE_LOOKUP_RADIUS,
            snap_duration: SNAP_DURATION,
            return_duration: RETURN_DURATION,
            drag_lift: DRAG_LIFT,
            resting_offset: RESTING_OFFSET,
            drag_plane_depth: DRAG_PLANE_DEPTH,
            cell_spacing: CELL_SPACING,
            board_spacing_horizontal: BOARD_SPACING_HORIZONTAL,
            board_spacing_vertical: BOARD_SPACING_VERTICAL,
            stage_resume_delay: STAGE_RESUME_DELAY,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON configuration; omitted fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error for malformed input or unknown keys.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "snap_duration": 0.0 }"#).unwrap();
        assert_eq!(config.snap_duration, 0.0);
        assert_eq!(config.return_duration, RETURN_DURATION);
        assert_eq!(config.cell_spacing, CELL_SPACING);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(EngineConfig::from_json(r#"{ "snap_speed": 1.0 }"#).is_err());
    }
}
