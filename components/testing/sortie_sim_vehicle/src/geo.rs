//! Flat earth integration of body frame displacements, good enough for a few hundred meters.

use sortie_payloads::Position;
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Moves `from` by a displacement expressed in the body frame of a vehicle
/// pointing at `heading` (0 is north, clockwise positive).
pub fn displace(from: Position, heading: Angle, forward: f64, right: f64, down: f64) -> Position {
    let h = heading.get::<radian>();
    let north = forward * h.cos() - right * h.sin();
    let east = forward * h.sin() + right * h.cos();
    let latitude = from.latitude().get::<radian>();
    let longitude = from.longitude().get::<radian>();
    Position::new(
        Angle::new::<radian>(latitude + north / EARTH_RADIUS_M),
        Angle::new::<radian>(longitude + east / (EARTH_RADIUS_M * latitude.cos())),
        Length::new::<meter>(from.altitude().get::<meter>() - down),
    )
}

/// Heading after a yaw, kept in [0, 2π).
pub fn turn(heading: Angle, yaw: Angle) -> Angle {
    let full = std::f64::consts::TAU;
    Angle::new::<radian>((heading.get::<radian>() + yaw.get::<radian>()).rem_euclid(full))
}
