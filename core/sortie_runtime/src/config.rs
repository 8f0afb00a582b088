//! Flight configuration, stored as RON.
//!
//! Every field has a default so a configuration file only needs to list what
//! it changes. Durations are written in milliseconds.

use ron::extensions::Extensions;
use ron::Options;
use serde::{Deserialize, Serialize};
use sortie_payloads::GimbalSpeed;
use sortie_traits::{SortieError, SortieResult};
use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

/// How long each kind of command may wait for its confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub takeoff_ms: u64,
    pub land_ms: u64,
    pub move_ms: u64,
    pub gimbal_ms: u64,
    pub camera_ms: u64,
    /// Acceptance deadline of the motor cut.
    pub emergency_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            takeoff_ms: 5_000,
            land_ms: 30_000,
            move_ms: 30_000,
            gimbal_ms: 5_000,
            camera_ms: 5_000,
            emergency_ms: 5_000,
        }
    }
}

impl Timeouts {
    pub fn takeoff(&self) -> Duration {
        Duration::from_millis(self.takeoff_ms)
    }

    pub fn land(&self) -> Duration {
        Duration::from_millis(self.land_ms)
    }

    pub fn moving(&self) -> Duration {
        Duration::from_millis(self.move_ms)
    }

    pub fn gimbal(&self) -> Duration {
        Duration::from_millis(self.gimbal_ms)
    }

    pub fn camera(&self) -> Duration {
        Duration::from_millis(self.camera_ms)
    }

    pub fn emergency(&self) -> Duration {
        Duration::from_millis(self.emergency_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixPolicy {
    pub attempts: u32,
    pub timeout_ms: u64,
}

impl Default for FixPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            timeout_ms: 60_000,
        }
    }
}

impl FixPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub timeouts: Timeouts,
    pub fix: FixPolicy,
    pub gimbal_max_speed: GimbalSpeed,
}

impl FlightConfig {
    fn get_options() -> Options {
        Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .with_default_extension(Extensions::UNWRAP_NEWTYPES)
            .with_default_extension(Extensions::UNWRAP_VARIANT_NEWTYPES)
    }

    pub fn serialize_ron(&self) -> SortieResult<String> {
        let ron = Self::get_options();
        let pretty = ron::ser::PrettyConfig::default();
        ron.to_string_pretty(&self, pretty)
            .map_err(|e| SortieError::new_with_cause("Failed to serialize the flight configuration", e))
    }

    pub fn deserialize_ron(ron: &str) -> SortieResult<Self> {
        Self::get_options()
            .from_str(ron)
            .map_err(|e| SortieError::new_with_cause("Syntax error in flight configuration", e))
    }
}

/// Read a flight configuration from a RON file.
pub fn read_configuration(config_filename: &Path) -> SortieResult<FlightConfig> {
    let config_content = read_to_string(config_filename).map_err(|e| {
        SortieError::from(format!(
            "Failed to read configuration file: {:?}",
            config_filename
        ))
        .add_cause(e.to_string().as_str())
    })?;
    FlightConfig::deserialize_ron(&config_content)
}
