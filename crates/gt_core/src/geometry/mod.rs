//! Rotation and projection math.
//!
//! Two concerns live here:
//!
//! - [`rotation`]: euler-to-quaternion conversion with the simulator's
//!   handedness flip, and quaternion-to-matrix for oriented boxes.
//! - [`projection`]: pinhole intrinsics, the world-to-camera-to-image
//!   chain, and bounding-box vertex projection.
//!
//! Both are pure; no IO, no state.

pub mod projection;
pub mod rotation;

pub use projection::{
    box_corners, camera_intrinsic, camera_to_image, inverse_extrinsic, project_bounding_box,
    projected_2d_bbox, world_to_camera, ProjectedVertex,
};
pub use rotation::{euler_to_quaternion, quaternion_to_matrix, relative_yaw, AngleUnit, Handedness};
