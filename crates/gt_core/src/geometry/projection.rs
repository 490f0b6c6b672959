//! Pinhole projection chain.
//!
//! World point -> sensor frame (inverse extrinsic) -> image plane
//! (intrinsic). The sensor frame follows the simulator convention of
//! x forward, y right, z up; the image plane wants y right, z down,
//! x forward, so the projection reorders components to `(y, -z, x)`
//! before applying the intrinsic matrix.
//!
//! A vertex with non-positive forward depth has no meaningful image
//! position. The chain surfaces that as `None` instead of dividing by a
//! degenerate depth, and the visibility layer counts such vertices as
//! out of view.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

use crate::snapshot::{BoundingBox, Pose, Vec3};

/// A box vertex on the image plane, with its forward depth in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedVertex {
    /// Pixel column, unclamped.
    pub x: f64,
    /// Pixel row, unclamped.
    pub y: f64,
    /// Distance along the camera forward axis. Always positive.
    pub depth: f64,
}

/// Pinhole intrinsic matrix for a camera.
///
/// Focal length derives from the horizontal field of view:
/// `f = width / (2 * tan(fov / 2))`, shared by both axes. The principal
/// point sits at the image center.
pub fn camera_intrinsic(width: u32, height: u32, fov_deg: f64) -> Matrix3<f64> {
    let focal = width as f64 / (2.0 * (fov_deg * std::f64::consts::PI / 360.0).tan());
    let mut k = Matrix3::identity();
    k[(0, 0)] = focal;
    k[(1, 1)] = focal;
    k[(0, 2)] = width as f64 / 2.0;
    k[(1, 2)] = height as f64 / 2.0;
    k
}

/// Inverse of a rigid sensor-to-world matrix.
///
/// Exploits rigidity (`R` orthonormal): the inverse is `R^T` with
/// translation `-R^T t`, cheaper and better conditioned than a general
/// 4x4 inversion.
pub fn inverse_extrinsic(extrinsic: &Matrix4<f64>) -> Matrix4<f64> {
    let rotation_t = extrinsic.fixed_view::<3, 3>(0, 0).transpose();
    let translation = extrinsic.fixed_view::<3, 1>(0, 3);
    let back = -(rotation_t * translation);
    let mut out = Matrix4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_t);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(&back);
    out
}

/// World location into the sensor frame.
#[inline]
pub fn world_to_camera(world: &Vec3, extrinsic_inv: &Matrix4<f64>) -> Vector3<f64> {
    let homogeneous = extrinsic_inv * Vector4::new(world.x, world.y, world.z, 1.0);
    homogeneous.xyz()
}

/// Sensor-frame point onto the image plane.
///
/// Returns `None` when the point sits on or behind the camera plane
/// (forward depth <= 0).
pub fn camera_to_image(camera: &Vector3<f64>, intrinsic: &Matrix3<f64>) -> Option<ProjectedVertex> {
    let depth = camera.x;
    if depth <= 0.0 {
        return None;
    }
    let reordered = Vector3::new(camera.y, -camera.z, camera.x);
    let pixel = intrinsic * reordered;
    Some(ProjectedVertex {
        x: pixel.x / depth,
        y: pixel.y / depth,
        depth,
    })
}

/// The eight corners of a box with the given half-extents, in the box's
/// local frame. Order is fixed: all sign combinations of `(x, y, z)`
/// with x varying fastest, top face first.
pub fn box_corners(extent: Vec3) -> [Vector3<f64>; 8] {
    let (x, y, z) = (extent.x, extent.y, extent.z);
    [
        Vector3::new(x, y, z),
        Vector3::new(-x, y, z),
        Vector3::new(x, -y, z),
        Vector3::new(-x, -y, z),
        Vector3::new(x, y, -z),
        Vector3::new(-x, y, -z),
        Vector3::new(x, -y, -z),
        Vector3::new(-x, -y, -z),
    ]
}

/// Projects all eight corners of an actor's bounding box.
///
/// The corner chain is box-local -> actor frame (box offset pose) ->
/// world (actor pose) -> sensor -> image. Corners behind the camera come
/// back as `None` in their slot so per-vertex bookkeeping stays aligned.
pub fn project_bounding_box(
    bbox: &BoundingBox,
    actor_pose: &Pose,
    extrinsic_inv: &Matrix4<f64>,
    intrinsic: &Matrix3<f64>,
) -> [Option<ProjectedVertex>; 8] {
    let to_image = extrinsic_inv * actor_pose.to_matrix() * bbox.local.to_matrix();
    let mut projected = [None; 8];
    for (slot, corner) in projected.iter_mut().zip(box_corners(bbox.extent)) {
        let camera = to_image * Vector4::new(corner.x, corner.y, corner.z, 1.0);
        *slot = camera_to_image(&camera.xyz(), intrinsic);
    }
    projected
}

/// Reduces projected vertices to a `[min_x, min_y, max_x, max_y]` pixel
/// box, truncating toward zero. `None` when no vertex projects in front
/// of the camera.
pub fn projected_2d_bbox(vertices: &[Option<ProjectedVertex>; 8]) -> Option<[i32; 4]> {
    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    for vertex in vertices.iter().flatten() {
        bounds = Some(match bounds {
            None => (vertex.x, vertex.y, vertex.x, vertex.y),
            Some((min_x, min_y, max_x, max_y)) => (
                min_x.min(vertex.x),
                min_y.min(vertex.y),
                max_x.max(vertex.x),
                max_y.max(vertex.y),
            ),
        });
    }
    bounds.map(|(min_x, min_y, max_x, max_y)| {
        [min_x as i32, min_y as i32, max_x as i32, max_y as i32]
    })
}

// ===== Tests =====
