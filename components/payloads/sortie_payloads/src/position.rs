use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

/// A geodetic position snapshot as reported by the vehicle.
///
/// This type does not enforce any bound: a glitching sensor can report
/// anything, and it is up to the consumer to decide whether it is plausible.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    latitude: Angle,
    longitude: Angle,
    /// Above ground level.
    altitude: Length,
}

impl Position {
    pub fn new(latitude: Angle, longitude: Angle, altitude: Length) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    pub fn from_degrees(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self::new(
            Angle::new::<degree>(latitude_deg),
            Angle::new::<degree>(longitude_deg),
            Length::new::<meter>(altitude_m),
        )
    }

    pub fn latitude(&self) -> Angle {
        self.latitude
    }

    pub fn longitude(&self) -> Angle {
        self.longitude
    }

    pub fn altitude(&self) -> Length {
        self.altitude
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{lat: {:.6}, long: {:.6}, AGL: {:.2}}}",
            self.latitude.get::<degree>(),
            self.longitude.get::<degree>(),
            self.altitude.get::<meter>()
        )
    }
}

// uom quantities are stored in their base unit, so encoding the raw value is lossless.
impl Encode for Position {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        self.latitude.get::<radian>().encode(encoder)?;
        self.longitude.get::<radian>().encode(encoder)?;
        self.altitude.get::<meter>().encode(encoder)
    }
}

impl<Context> Decode<Context> for Position {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let latitude: f64 = Decode::decode(decoder)?;
        let longitude: f64 = Decode::decode(decoder)?;
        let altitude: f64 = Decode::decode(decoder)?;
        Ok(Self::new(
            Angle::new::<radian>(latitude),
            Angle::new::<radian>(longitude),
            Length::new::<meter>(altitude),
        ))
    }
}

bincode::impl_borrow_decode!(Position);
