//! Motion side-channel record.

use std::fmt;

use crate::descriptor::ObjectClass;
use crate::snapshot::Vec3;

/// One line of the per-frame kinematic label file: class followed by
/// velocity, acceleration and angular velocity, nine values total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicRecord {
    class: ObjectClass,
    velocity: Vec3,
    acceleration: Vec3,
    angular_velocity: Vec3,
}

impl KinematicRecord {
    pub fn new(
        class: ObjectClass,
        velocity: Vec3,
        acceleration: Vec3,
        angular_velocity: Vec3,
    ) -> Self {
        KinematicRecord {
            class,
            velocity,
            acceleration,
            angular_velocity,
        }
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }
}

impl fmt::Display for KinematicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {}",
            self.class,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.acceleration.x,
            self.acceleration.y,
            self.acceleration.z,
            self.angular_velocity.x,
            self.angular_velocity.y,
            self.angular_velocity.z
        )
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_line() {
        let record = KinematicRecord::new(
            ObjectClass::Car,
            Vec3::new(5.5, -0.25, 0.0),
            Vec3::new(0.0, 0.0, -9.75),
            Vec3::new(0.0, 0.5, 0.0),
        );
        assert_eq!(record.to_string(), "Car 5.5 -0.25 0 0 0 -9.75 0 0.5 0");
    }

    #[test]
    fn test_stationary_actor() {
        let record =
            KinematicRecord::new(ObjectClass::Pedestrian, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(record.to_string(), "Pedestrian 0 0 0 0 0 0 0 0 0");
    }
}
