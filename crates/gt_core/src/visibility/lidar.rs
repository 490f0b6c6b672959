//! Lidar-return counting inside oriented boxes.

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

/// An oriented box in the sensor frame.
///
/// `rotation` maps box-local axes into the sensor frame. Extents are
/// stored as half-sizes; the constructor takes the full size to match
/// how box dimensions travel through the rest of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    center: Vector3<f64>,
    rotation: Matrix3<f64>,
    half_size: Vector3<f64>,
}

impl OrientedBox {
    pub fn new(center: Vector3<f64>, rotation: Matrix3<f64>, size: [f64; 3]) -> Self {
        OrientedBox {
            center,
            rotation,
            half_size: Vector3::new(size[0] / 2.0, size[1] / 2.0, size[2] / 2.0),
        }
    }

    /// Membership test, boundary faces inclusive.
    #[inline]
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        let local = self.rotation.transpose() * (point - self.center);
        local.x.abs() <= self.half_size.x
            && local.y.abs() <= self.half_size.y
            && local.z.abs() <= self.half_size.z
    }
}

/// Number of cloud points inside the box.
///
/// Clouds run to six figures per frame, so the scan is parallel.
pub fn count_points_in_box(points: &[[f32; 3]], obb: &OrientedBox) -> u32 {
    points
        .par_iter()
        .filter(|p| {
            let point = Vector3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]));
            obb.contains(&point)
        })
        .count() as u32
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn axis_aligned_box() -> OrientedBox {
        OrientedBox::new(Vector3::new(10.0, 0.0, 1.0), Matrix3::identity(), [4.0, 2.0, 2.0])
    }

    #[test]
    fn test_contains_center_and_faces() {
        let obb = axis_aligned_box();
        assert!(obb.contains(&Vector3::new(10.0, 0.0, 1.0)));
        // Boundary faces are inclusive.
        assert!(obb.contains(&Vector3::new(12.0, 0.0, 1.0)));
        assert!(obb.contains(&Vector3::new(10.0, 1.0, 2.0)));
        // Just past the face.
        assert!(!obb.contains(&Vector3::new(12.001, 0.0, 1.0)));
    }

    #[test]
    fn test_rotated_box_membership() {
        // Box yawed 45 degrees about z: the point that was on the +x face
        // moves off-axis.
        let yaw = FRAC_PI_4;
        let rotation = Matrix3::new(
            yaw.cos(),
            -yaw.sin(),
            0.0,
            yaw.sin(),
            yaw.cos(),
            0.0,
            0.0,
            0.0,
            1.0,
        );
        let obb = OrientedBox::new(Vector3::zeros(), rotation, [4.0, 0.5, 2.0]);
        let along_rotated_x = rotation * Vector3::new(1.9, 0.0, 0.0);
        assert!(obb.contains(&along_rotated_x));
        // The unrotated +x direction now exits through the thin side.
        assert!(!obb.contains(&Vector3::new(1.9, 0.0, 0.0)));
    }

    #[test]
    fn test_count_points() {
        let obb = axis_aligned_box();
        let mut points: Vec<[f32; 3]> = Vec::new();
        for i in 0..10 {
            points.push([10.0 + (i as f32) * 0.1, 0.0, 1.0]); // inside
        }
        points.push([20.0, 0.0, 1.0]); // outside
        points.push([10.0, 5.0, 1.0]); // outside
        assert_eq!(count_points_in_box(&points, &obb), 10);
    }

    #[test]
    fn test_empty_cloud_counts_zero() {
        assert_eq!(count_points_in_box(&[], &axis_aligned_box()), 0);
    }
}
