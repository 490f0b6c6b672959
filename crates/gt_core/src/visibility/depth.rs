//! Depth-image occlusion tests for projected box vertices.
//!
//! A vertex is *visible* when it projects in front of the camera within
//! the render depth, lands on the canvas, and is not hidden behind
//! rendered geometry. A vertex is *out of view* when it projects behind
//! the camera, beyond the render depth, or off the canvas. An on-canvas
//! vertex that fails the occlusion probe is neither: it is occluded and
//! contributes to no counter.

use crate::geometry::ProjectedVertex;
use crate::snapshot::DepthBuffer;

/// Vertex tallies for one projected box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OcclusionStats {
    pub visible: u32,
    pub out_of_view: u32,
}

/// At least this many visible vertices for the fully-visible tier.
const FULLY_VISIBLE_MIN: u32 = 6;
/// At least this many for the partly-visible tier.
const PARTLY_VISIBLE_MIN: u32 = 4;

#[inline]
fn in_canvas(x: f64, y: f64, width: u32, height: u32) -> bool {
    x >= 0.0 && x < f64::from(width) && y >= 0.0 && y < f64::from(height)
}

/// Probes the depth image around a vertex to decide occlusion.
///
/// Samples the four diagonal neighbor pixels. The vertex counts as
/// occluded when every neighbor that lies on the canvas is closer to the
/// camera than the vertex itself. A vertex whose neighbors all fall off
/// the canvas is treated as occluded.
pub fn point_is_occluded(vertex: &ProjectedVertex, depth_image: &DepthBuffer) -> bool {
    let x = vertex.x as i64;
    let y = vertex.y as i64;
    let neighbors = [(1i64, 1i64), (1, -1), (-1, 1), (-1, -1)];
    neighbors
        .iter()
        .filter(|(dy, dx)| {
            in_canvas(
                (x + dx) as f64,
                (y + dy) as f64,
                depth_image.width(),
                depth_image.height(),
            )
        })
        .all(|(dy, dx)| {
            let sampled = depth_image.at((x + dx) as u32, (y + dy) as u32);
            f64::from(sampled) < vertex.depth
        })
}

/// Tallies the eight projected vertices of a box against the depth image.
///
/// `None` slots (behind the camera) count as out of view, as do vertices
/// beyond `max_render_depth` or off the canvas.
pub fn occlusion_stats(
    vertices: &[Option<ProjectedVertex>; 8],
    depth_image: &DepthBuffer,
    max_render_depth: f64,
) -> OcclusionStats {
    let mut stats = OcclusionStats::default();
    for slot in vertices {
        let in_view = slot.filter(|v| {
            v.depth > 0.0
                && v.depth < max_render_depth
                && in_canvas(v.x, v.y, depth_image.width(), depth_image.height())
        });
        match in_view {
            Some(vertex) => {
                if !point_is_occluded(&vertex, depth_image) {
                    stats.visible += 1;
                }
            }
            None => stats.out_of_view += 1,
        }
    }
    stats
}

/// Occlusion tier from the visible-vertex count: 0 fully visible,
/// 1 partly, 2 largely occluded.
#[inline]
pub fn occlusion_tier(visible: u32) -> u8 {
    if visible >= FULLY_VISIBLE_MIN {
        0
    } else if visible >= PARTLY_VISIBLE_MIN {
        1
    } else {
        2
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f64, y: f64, depth: f64) -> ProjectedVertex {
        ProjectedVertex { x, y, depth }
    }

    #[test]
    fn test_unoccluded_vertex_in_open_space() {
        let depth_image = DepthBuffer::filled(100, 100, 500.0);
        assert!(!point_is_occluded(&vertex(50.0, 50.0, 20.0), &depth_image));
    }

    #[test]
    fn test_occluded_when_all_neighbors_closer() {
        let depth_image = DepthBuffer::filled(100, 100, 5.0);
        assert!(point_is_occluded(&vertex(50.0, 50.0, 20.0), &depth_image));
    }

    #[test]
    fn test_single_farther_neighbor_clears_occlusion() {
        let mut data = vec![5.0f32; 100 * 100];
        // Neighbor at (row 51, col 51) is farther than the vertex.
        data[51 * 100 + 51] = 30.0;
        let depth_image = DepthBuffer::new(100, 100, data).unwrap();
        assert!(!point_is_occluded(&vertex(50.0, 50.0, 20.0), &depth_image));
    }

    #[test]
    fn test_corner_vertex_with_no_neighbors_is_occluded() {
        // Vertex outside the canvas corner: every diagonal neighbor is
        // off-canvas, and the empty probe set reads as occluded.
        let depth_image = DepthBuffer::filled(100, 100, 500.0);
        assert!(point_is_occluded(&vertex(-5.0, -5.0, 20.0), &depth_image));
    }

    #[test]
    fn test_stats_counts_behind_camera_as_out() {
        let depth_image = DepthBuffer::filled(100, 100, 500.0);
        let mut vertices: [Option<ProjectedVertex>; 8] = [None; 8];
        vertices[0] = Some(vertex(50.0, 50.0, 20.0));
        let stats = occlusion_stats(&vertices, &depth_image, 70.0);
        assert_eq!(stats.visible, 1);
        assert_eq!(stats.out_of_view, 7);
    }

    #[test]
    fn test_stats_depth_bound_is_strict() {
        let depth_image = DepthBuffer::filled(100, 100, 5000.0);
        let mut vertices: [Option<ProjectedVertex>; 8] = [None; 8];
        vertices[0] = Some(vertex(50.0, 50.0, 70.0)); // exactly at the limit
        vertices[1] = Some(vertex(50.0, 50.0, 69.9));
        let stats = occlusion_stats(&vertices, &depth_image, 70.0);
        assert_eq!(stats.visible, 1, "only the vertex under the limit counts");
        assert_eq!(stats.out_of_view, 7);
    }

    #[test]
    fn test_stats_off_canvas_counts_as_out() {
        let depth_image = DepthBuffer::filled(100, 100, 500.0);
        let mut vertices: [Option<ProjectedVertex>; 8] = [None; 8];
        vertices[0] = Some(vertex(150.0, 50.0, 20.0));
        vertices[1] = Some(vertex(50.0, -1.0, 20.0));
        let stats = occlusion_stats(&vertices, &depth_image, 70.0);
        assert_eq!(stats.visible, 0);
        assert_eq!(stats.out_of_view, 8);
    }

    #[test]
    fn test_occluded_vertex_counts_neither_way() {
        let depth_image = DepthBuffer::filled(100, 100, 5.0);
        let mut vertices: [Option<ProjectedVertex>; 8] = [None; 8];
        vertices[0] = Some(vertex(50.0, 50.0, 20.0)); // occluded, on canvas
        let stats = occlusion_stats(&vertices, &depth_image, 70.0);
        assert_eq!(stats.visible, 0);
        assert_eq!(stats.out_of_view, 7, "occluded vertex is not out of view");
    }

    #[test]
    fn test_occlusion_tiers() {
        assert_eq!(occlusion_tier(8), 0);
        assert_eq!(occlusion_tier(6), 0);
        assert_eq!(occlusion_tier(5), 1);
        assert_eq!(occlusion_tier(4), 1);
        assert_eq!(occlusion_tier(3), 2);
        assert_eq!(occlusion_tier(0), 2);
    }
}
