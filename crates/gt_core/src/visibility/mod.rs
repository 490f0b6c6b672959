//! Actor visibility decisions.
//!
//! Two interchangeable policies decide whether an actor made it into the
//! frame:
//!
//! - [`lidar`]: count lidar returns inside the actor's oriented box and
//!   require a minimum number of hits. The default.
//! - [`depth`]: project the box vertices and test each against the
//!   camera depth image, deriving truncation and an occlusion tier.
//!
//! Both reduce to a [`Visibility`] carried into the descriptors, or
//! `None` when the actor is dropped from the frame.

pub mod depth;
pub mod lidar;

use crate::config::FilterConfig;
use crate::geometry::{projected_2d_bbox, ProjectedVertex};
use crate::snapshot::{ActorState, DepthBuffer, Vec3};

pub use depth::{occlusion_stats, occlusion_tier, point_is_occluded, OcclusionStats};
pub use lidar::{count_points_in_box, OrientedBox};

/// Outcome of a visibility decision for one actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    /// Fraction of box vertices outside the view, `[0, 1]`. Zero under
    /// the lidar policy.
    pub truncation: f64,
    /// Occlusion tier 0..=2 (fully visible, partly, largely occluded).
    /// Zero under the lidar policy.
    pub occlusion: u8,
    /// Projected pixel box. `None` under the lidar policy.
    pub bbox_2d: Option<[i32; 4]>,
    /// Lidar returns inside the actor's box.
    pub num_lidar_pts: u32,
}

/// Lidar-policy decision from a point count.
pub fn lidar_visibility(count: u32, filter: &FilterConfig) -> Option<Visibility> {
    if count < filter.min_lidar_points {
        return None;
    }
    Some(Visibility {
        truncation: 0.0,
        occlusion: 0,
        bbox_2d: None,
        num_lidar_pts: count,
    })
}

/// Depth-policy decision from projected vertices and the depth image.
///
/// The caller fills `num_lidar_pts` afterwards when a cloud is present;
/// the depth policy itself only reasons about vertices.
pub fn depth_visibility(
    vertices: &[Option<ProjectedVertex>; 8],
    depth_image: &DepthBuffer,
    filter: &FilterConfig,
) -> Option<Visibility> {
    let stats = occlusion_stats(vertices, depth_image, filter.max_render_depth);
    let included = stats.visible >= filter.min_visible_vertices
        && stats.out_of_view < filter.max_out_vertices;
    if !included {
        return None;
    }
    Some(Visibility {
        truncation: f64::from(stats.out_of_view) / 8.0,
        occlusion: occlusion_tier(stats.visible),
        bbox_2d: projected_2d_bbox(vertices),
        num_lidar_pts: 0,
    })
}

/// Drops actors beyond `max_distance` meters of planar distance from the
/// ego. Runs before any projection work.
pub fn filter_by_distance(actors: &mut Vec<ActorState>, ego_location: &Vec3, max_distance: f64) {
    actors.retain(|actor| actor.pose.location.planar_distance(ego_location) < max_distance);
}

// ===== Tests =====
