use sortie_payloads::Position;
use sortie_traits::SortieError;
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

const MAX_LATITUDE_DEG: f64 = 90.0;
const MAX_LONGITUDE_DEG: f64 = 180.0;
const MAX_ALTITUDE_M: f64 = 200.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionField {
    Latitude,
    Longitude,
    Altitude,
}

impl Display for PositionField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionField::Latitude => write!(f, "latitude"),
            PositionField::Longitude => write!(f, "longitude"),
            PositionField::Altitude => write!(f, "altitude"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum PositionError {
    #[error("No GPS fix, position unavailable")]
    NoFix,
    #[error("Invalid {field}: {value}")]
    OutOfBounds { field: PositionField, value: f64 },
    #[error("Connection error: {0}")]
    Connection(#[from] SortieError),
}

fn angle_within(value: Angle, limit_deg: f64) -> bool {
    let limit = Angle::new::<degree>(limit_deg).get::<radian>();
    let raw = value.get::<radian>();
    raw.is_finite() && raw.abs() <= limit
}

fn length_within(value: Length, limit_m: f64) -> bool {
    let raw = value.get::<meter>();
    raw.is_finite() && raw.abs() <= limit_m
}

/// Checks a reported position against the physical bounds, latitude first.
///
/// Latitude and longitude are reported back in degrees, altitude in meters.
pub fn validate(position: Option<Position>) -> Result<Position, PositionError> {
    let position = position.ok_or(PositionError::NoFix)?;
    if !angle_within(position.latitude(), MAX_LATITUDE_DEG) {
        return Err(PositionError::OutOfBounds {
            field: PositionField::Latitude,
            value: position.latitude().get::<degree>(),
        });
    }
    if !angle_within(position.longitude(), MAX_LONGITUDE_DEG) {
        return Err(PositionError::OutOfBounds {
            field: PositionField::Longitude,
            value: position.longitude().get::<degree>(),
        });
    }
    if !length_within(position.altitude(), MAX_ALTITUDE_M) {
        return Err(PositionError::OutOfBounds {
            field: PositionField::Altitude,
            value: position.altitude().get::<meter>(),
        });
    }
    Ok(position)
}
