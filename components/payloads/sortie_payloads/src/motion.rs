use crate::Action;
use serde::{Deserialize, Serialize};
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

/// A move relative to the vehicle's current position and heading.
///
/// `up` is positive upwards and `yaw` positive when turning right, which is
/// how an operator thinks about it. The vehicle wants a down axis, see
/// [`RelativeMove::to_action`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeMove {
    pub forward: Length,
    pub right: Length,
    pub up: Length,
    pub yaw: Angle,
}

impl RelativeMove {
    pub fn new() -> Self {
        Self {
            forward: Length::new::<meter>(0.0),
            right: Length::new::<meter>(0.0),
            up: Length::new::<meter>(0.0),
            yaw: Angle::new::<radian>(0.0),
        }
    }

    pub fn forward(mut self, distance: Length) -> Self {
        self.forward = distance;
        self
    }

    pub fn right(mut self, distance: Length) -> Self {
        self.right = distance;
        self
    }

    pub fn up(mut self, distance: Length) -> Self {
        self.up = distance;
        self
    }

    pub fn yaw(mut self, angle: Angle) -> Self {
        self.yaw = angle;
        self
    }

    pub fn is_null(&self) -> bool {
        self.forward.get::<meter>() == 0.0
            && self.right.get::<meter>() == 0.0
            && self.up.get::<meter>() == 0.0
            && self.yaw.get::<radian>() == 0.0
    }

    pub fn to_action(&self) -> Action {
        Action::MoveBy {
            dx: self.forward.get::<meter>() as f32,
            dy: self.right.get::<meter>() as f32,
            dz: -self.up.get::<meter>() as f32,
            dpsi: self.yaw.get::<radian>() as f32,
        }
    }
}

impl Default for RelativeMove {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use uom::si::angle::degree;

    #[test]
    fn test_up_becomes_negative_down() {
        let mv = RelativeMove::new()
            .forward(Length::new::<meter>(-20.0))
            .up(Length::new::<meter>(2.0));
        let Action::MoveBy { dx, dy, dz, dpsi } = mv.to_action() else {
            panic!("expected a MoveBy");
        };
        assert_relative_eq!(dx, -20.0);
        assert_relative_eq!(dy, 0.0);
        assert_relative_eq!(dz, -2.0);
        assert_relative_eq!(dpsi, 0.0);
    }

    #[test]
    fn test_yaw_is_sent_in_radians() {
        let mv = RelativeMove::new().yaw(Angle::new::<degree>(-30.0));
        let Action::MoveBy { dpsi, .. } = mv.to_action() else {
            panic!("expected a MoveBy");
        };
        assert_relative_eq!(dpsi, -std::f32::consts::FRAC_PI_6, epsilon = 1e-6);
    }

    #[test]
    fn test_null_move() {
        assert!(RelativeMove::new().is_null());
        assert!(!RelativeMove::new().right(Length::new::<meter>(0.5)).is_null());
    }
}
