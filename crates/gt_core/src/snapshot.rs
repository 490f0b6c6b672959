//! Per-frame input boundary.
//!
//! The exporter never talks to a simulator directly. The host samples the
//! world once per frame and hands over a [`FrameSnapshot`]: the ego pose
//! and IMU readings, every candidate actor with its bounding box and
//! kinematics, the lidar cloud in the reference sensor frame, and an
//! optional depth buffer for the reference camera. Everything downstream
//! (projection, visibility, descriptors, the token graph) derives from
//! this one value.
//!
//! Angles are degrees throughout the boundary, matching the simulator
//! convention. Conversion to radians happens inside the geometry layer.

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable simulator identity of an actor, unique for the run.
///
/// Used as the registry key that makes an actor the *same instance*
/// across samples and scenes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ActorId(pub u64);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ActorId {
    fn from(raw: u64) -> Self {
        ActorId(raw)
    }
}

/// Right-handed-on-paper 3D vector in simulator world units (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    /// Euclidean distance in the ground plane, ignoring z.
    ///
    /// The distance pre-filter deliberately ignores height so an actor on
    /// a bridge above the ego is still a candidate.
    #[inline]
    pub fn planar_distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    #[inline]
    pub fn as_vector(&self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.x, self.y, self.z)
    }
}

/// Euler orientation in degrees, simulator convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotation {
    #[inline]
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Rotation { pitch, yaw, roll }
    }
}

/// Position plus orientation. The composable unit of the transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    pub location: Vec3,
    pub rotation: Rotation,
}

impl Pose {
    pub fn new(location: Vec3, rotation: Rotation) -> Self {
        Pose { location, rotation }
    }

    /// Homogeneous local-to-world matrix in the simulator's convention.
    ///
    /// Row order is the engine's yaw-pitch-roll composition; composing
    /// `ego.to_matrix() * mount.to_matrix()` yields the world transform of
    /// a sensor mounted on the ego body.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let (sp, cp) = self.rotation.pitch.to_radians().sin_cos();
        let (sy, cy) = self.rotation.yaw.to_radians().sin_cos();
        let (sr, cr) = self.rotation.roll.to_radians().sin_cos();
        let loc = self.location;
        Matrix4::new(
            cp * cy,
            cy * sp * sr - sy * cr,
            -cy * sp * cr - sy * sr,
            loc.x,
            cp * sy,
            sy * sp * sr + cy * cr,
            -sy * sp * cr + cy * sr,
            loc.y,
            sp,
            -cp * sr,
            cp * cr,
            loc.z,
            0.0,
            0.0,
            0.0,
            1.0,
        )
    }
}

/// Axis-aligned half-extents plus the box's pose within the actor frame.
///
/// `extent` is half the box size along each local axis. `local` is the
/// offset of the box center from the actor origin (a vehicle's box is
/// centered on the chassis, not on the pivot).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub extent: Vec3,
    pub local: Pose,
}

/// One candidate actor as sampled from the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: ActorId,
    /// Simulator blueprint id, e.g. `vehicle.tesla.model3` or
    /// `walker.pedestrian.0001`. Drives class mapping.
    pub type_id: String,
    pub pose: Pose,
    pub bounding_box: BoundingBox,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub angular_velocity: Vec3,
}

/// Inertial readings attached to the ego for the CAN bus side channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ImuSample {
    pub acceleration: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// Ego vehicle state for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EgoState {
    pub pose: Pose,
    pub imu: ImuSample,
}

/// Row-major depth image for the reference camera, meters per pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthBuffer {
    /// Wraps a row-major depth image. Fails if `data` does not hold
    /// exactly `width * height` values.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, ValidationError> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(ValidationError::DepthBufferSize {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(DepthBuffer {
            width,
            height,
            data,
        })
    }

    /// Constant-depth buffer. Convenient for rigs without a real depth
    /// sensor and for tests.
    pub fn filled(width: u32, height: u32, depth: f32) -> Self {
        DepthBuffer {
            width,
            height,
            data: vec![depth; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Depth at pixel column `x`, row `y`. Caller guarantees bounds.
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }
}

/// Everything the exporter consumes for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Simulation time in seconds.
    pub timestamp: f64,
    pub ego: EgoState,
    pub actors: Vec<ActorState>,
    /// Lidar cloud in the reference sensor frame, XYZ per point.
    pub lidar: Vec<[f32; 3]>,
    /// Depth image of the reference camera. Required only under the
    /// depth visibility policy.
    pub depth: Option<DepthBuffer>,
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_pose_matrix() {
        let m = Pose::default().to_matrix();
        assert_eq!(m, Matrix4::identity());
    }

    #[test]
    fn test_pose_matrix_carries_translation() {
        let pose = Pose::new(Vec3::new(1.0, -2.0, 3.5), Rotation::default());
        let m = pose.to_matrix();
        assert_eq!(m[(0, 3)], 1.0);
        assert_eq!(m[(1, 3)], -2.0);
        assert_eq!(m[(2, 3)], 3.5);
    }

    #[test]
    fn test_pose_matrix_yaw_quarter_turn() {
        // 90 degree yaw maps local +x onto world +y in this convention.
        let pose = Pose::new(Vec3::ZERO, Rotation::new(0.0, 90.0, 0.0));
        let m = pose.to_matrix();
        let fwd = m * nalgebra::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!(fwd.x.abs() < 1e-12, "x should vanish, got {}", fwd.x);
        assert!((fwd.y - 1.0).abs() < 1e-12, "y should be 1, got {}", fwd.y);
    }

    #[test]
    fn test_planar_distance_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 100.0);
        assert!((a.planar_distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_depth_buffer_rejects_size_mismatch() {
        let err = DepthBuffer::new(4, 2, vec![0.0; 7]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DepthBufferSize { width: 4, height: 2, len: 7 }
        ));
    }

    #[test]
    fn test_depth_buffer_row_major_indexing() {
        let mut data = vec![0.0f32; 6];
        data[5] = 9.0; // row 1, column 2 of a 3-wide image
        let buf = DepthBuffer::new(3, 2, data).unwrap();
        assert_eq!(buf.at(2, 1), 9.0);
        assert_eq!(buf.at(2, 0), 0.0);
    }
}
