//! Dataset-format annotation payload.

use serde::{Deserialize, Serialize};

use crate::descriptor::ObjectClass;
use crate::snapshot::ActorId;

/// Geometry and identity of one visible actor, ready for the token
/// graph.
///
/// The descriptor carries no token and no links; the graph builder mints
/// the record token, resolves the category name against the config
/// table, and threads the instance chain when the descriptor is
/// appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDescriptor {
    pub actor_id: ActorId,
    /// Dataset category name, e.g. `vehicle.car`.
    pub category: String,
    /// World translation with the export-frame x flip applied, vehicles
    /// raised to box-bottom reference.
    pub translation: [f64; 3],
    /// Full box size as (width, length, height).
    pub size: [f64; 3],
    /// Orientation as `[w, x, y, z]`.
    pub rotation: [f64; 4],
    /// Lidar returns inside the box at capture time.
    pub num_lidar_pts: u32,
}

impl AnnotationDescriptor {
    pub fn new(
        actor_id: ActorId,
        class: ObjectClass,
        translation: [f64; 3],
        size: [f64; 3],
        rotation: [f64; 4],
        num_lidar_pts: u32,
    ) -> Self {
        AnnotationDescriptor {
            actor_id,
            category: class.category_name().to_string(),
            translation,
            size,
            rotation,
            num_lidar_pts,
        }
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_follows_class() {
        let descriptor = AnnotationDescriptor::new(
            ActorId(7),
            ObjectClass::Pedestrian,
            [1.0, 2.0, 3.0],
            [0.8, 0.8, 1.8],
            [1.0, 0.0, 0.0, 0.0],
            42,
        );
        assert_eq!(descriptor.category, "human.pedestrian.adult");
        assert_eq!(descriptor.actor_id, ActorId(7));
        assert_eq!(descriptor.num_lidar_pts, 42);
    }
}
