//! Quaternion math for dataset orientations.
//!
//! The simulator hands out left-handed euler angles in degrees. Dataset
//! consumers expect right-handed `[w, x, y, z]` quaternions. The
//! conversion negates yaw and roll before composing the half-angle
//! products; every orientation written to the output files goes through
//! [`euler_to_quaternion`] with [`Handedness::Flip`].

use nalgebra::{Matrix3, Quaternion, UnitQuaternion};

/// Whether euler inputs are degrees or already radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Degrees,
    Radians,
}

/// Whether to compensate for the simulator's left-handed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    /// Negate yaw and roll, left-handed input to right-handed output.
    Flip,
    /// Compose the angles as given.
    Keep,
}

/// Euler angles to a `[w, x, y, z]` quaternion.
///
/// With [`Handedness::Flip`] yaw and roll are negated to move from the
/// simulator's left-handed frame into the dataset's right-handed one
/// before composing the standard yaw-pitch-roll rotation. The result is
/// unit length by construction.
pub fn euler_to_quaternion(
    pitch: f64,
    yaw: f64,
    roll: f64,
    unit: AngleUnit,
    handedness: Handedness,
) -> [f64; 4] {
    let mut pitch = pitch;
    let (mut yaw, mut roll) = match handedness {
        Handedness::Flip => (-yaw, -roll),
        Handedness::Keep => (yaw, roll),
    };
    if unit == AngleUnit::Degrees {
        pitch = pitch.to_radians();
        yaw = yaw.to_radians();
        roll = roll.to_radians();
    }

    let (sr, cr) = (roll / 2.0).sin_cos();
    let (sp, cp) = (pitch / 2.0).sin_cos();
    let (sy, cy) = (yaw / 2.0).sin_cos();

    let qw = cr * cp * cy + sr * sp * sy;
    let qx = sr * cp * cy - cr * sp * sy;
    let qy = cr * sp * cy + sr * cp * sy;
    let qz = cr * cp * sy - sr * sp * cy;
    [qw, qx, qy, qz]
}

/// Rotation matrix of a `[w, x, y, z]` quaternion.
///
/// Used to orient the lidar counting box. Input is renormalized, so a
/// slightly drifted quaternion still yields a proper rotation.
pub fn quaternion_to_matrix(q: &[f64; 4]) -> Matrix3<f64> {
    let quat = Quaternion::new(q[0], q[1], q[2], q[3]);
    UnitQuaternion::from_quaternion(quat)
        .to_rotation_matrix()
        .into_inner()
}

/// Heading of an object relative to an observer, in radians.
///
/// Inputs are yaw angles in degrees. The result is *not* reduced; the
/// caller applies `rem_euclid(PI)` where the record format wants the
/// axis-symmetric heading.
#[inline]
pub fn relative_yaw(object_yaw_deg: f64, observer_yaw_deg: f64) -> f64 {
    (object_yaw_deg - observer_yaw_deg).to_radians()
}

// ===== Tests =====
