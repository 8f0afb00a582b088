//! Mission files.
//!
//! A mission is written in RON with the same extensions as the flight
//! configuration, so a move step reads `Move(forward: 40.0)`.

use compact_str::CompactString;
use ron::extensions::Extensions;
use ron::Options;
use serde::{Deserialize, Serialize};
use sortie_payloads::{CameraMode, RelativeMove};
use sortie_runtime::config::FixPolicy;
use sortie_traits::{SortieError, SortieResult};
use std::fs::read_to_string;
use std::path::Path;
use uom::si::angle::degree;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

/// A move the way an operator writes it: meters and degrees, every direction positive.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveStep {
    pub forward: f64,
    pub backward: f64,
    pub right: f64,
    pub left: f64,
    pub up: f64,
    pub down: f64,
    pub turn_right: f64,
    pub turn_left: f64,
}

impl MoveStep {
    pub fn to_relative(&self) -> RelativeMove {
        RelativeMove::new()
            .forward(Length::new::<meter>(self.forward - self.backward))
            .right(Length::new::<meter>(self.right - self.left))
            .up(Length::new::<meter>(self.up - self.down))
            .yaw(Angle::new::<degree>(self.turn_right - self.turn_left))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Step {
    Move(MoveStep),
    /// Absolute gimbal pitch in degrees.
    Gimbal(f64),
    Camera(CameraMode),
    /// Hover in place for this many milliseconds.
    Hold(u64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub vehicle: CompactString,
    /// Overrides the fix policy of the flight configuration.
    #[serde(default)]
    pub fix: Option<FixPolicy>,
    #[serde(default)]
    pub camera: Option<CameraMode>,
    #[serde(default)]
    pub gimbal_pitch: Option<f64>,
    /// Wait for the operator between the position check and the takeoff.
    #[serde(default)]
    pub pause: bool,
    pub steps: Vec<Step>,
}

impl Mission {
    fn get_options() -> Options {
        Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .with_default_extension(Extensions::UNWRAP_NEWTYPES)
            .with_default_extension(Extensions::UNWRAP_VARIANT_NEWTYPES)
    }

    pub fn deserialize_ron(ron: &str) -> SortieResult<Self> {
        Self::get_options()
            .from_str(ron)
            .map_err(|e| SortieError::new_with_cause("Syntax error in mission", e))
    }
}

pub fn read_mission(mission_filename: &Path) -> SortieResult<Mission> {
    let content = read_to_string(mission_filename).map_err(|e| {
        SortieError::from(format!("Failed to read mission file: {:?}", mission_filename))
            .add_cause(e.to_string().as_str())
    })?;
    Mission::deserialize_ron(&content)
}
