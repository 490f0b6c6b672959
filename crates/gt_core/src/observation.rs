//! Per-frame observation assembly.
//!
//! [`ObservationBuilder`] turns a [`FrameSnapshot`] into the set of
//! visible-actor records for that frame. For each candidate actor it
//! projects the box midpoint into the reference sensor frame, decides
//! visibility under the configured policy, and emits the three
//! descriptors (detection, kinematic, annotation) in one pass so they
//! can never disagree about geometry.
//!
//! Actors are independent; the per-actor work runs parallel over the
//! frame's candidate list.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Matrix4};
use rayon::prelude::*;
use tracing::debug;

use crate::config::{ExportConfig, FilterConfig, VisibilityPolicy};
use crate::descriptor::{AnnotationDescriptor, DetectionRecord, KinematicRecord, ObjectClass};
use crate::error::ValidationError;
use crate::geometry::{
    camera_intrinsic, euler_to_quaternion, inverse_extrinsic, project_bounding_box,
    quaternion_to_matrix, relative_yaw, world_to_camera, AngleUnit, Handedness,
};
use crate::snapshot::{ActorState, FrameSnapshot};
use crate::visibility::{
    count_points_in_box, depth_visibility, filter_by_distance, lidar_visibility, OrientedBox,
    Visibility,
};

/// The three records produced for one visible actor.
#[derive(Debug, Clone)]
pub struct Observation {
    pub detection: DetectionRecord,
    pub kinematic: KinematicRecord,
    pub annotation: AnnotationDescriptor,
}

/// Builds per-frame observations against a fixed reference camera.
#[derive(Debug, Clone)]
pub struct ObservationBuilder {
    intrinsic: Matrix3<f64>,
    /// Mount matrix of the reference camera on the ego body.
    mount: Matrix4<f64>,
    filter: FilterConfig,
}

impl ObservationBuilder {
    pub fn new(config: &ExportConfig) -> Result<Self, ValidationError> {
        let camera = config.reference_camera().ok_or_else(|| {
            ValidationError::InvalidConfig("no camera sensor available for projection".to_string())
        })?;
        let attribute = camera.attribute.ok_or_else(|| ValidationError::InvalidSensor {
            channel: camera.channel.clone(),
            reason: "camera sensor is missing its attribute block".to_string(),
        })?;
        Ok(ObservationBuilder {
            intrinsic: camera_intrinsic(
                attribute.image_size_x,
                attribute.image_size_y,
                attribute.fov,
            ),
            mount: camera.transform.pose().to_matrix(),
            filter: config.filter,
        })
    }

    /// All visible-actor observations for one frame.
    ///
    /// Fails fast when the depth policy is active but the snapshot
    /// carries no depth buffer.
    pub fn build(&self, snapshot: &FrameSnapshot) -> Result<Vec<Observation>, ValidationError> {
        if self.filter.policy == VisibilityPolicy::Depth && snapshot.depth.is_none() {
            return Err(ValidationError::MissingDepthBuffer);
        }

        let extrinsic = snapshot.ego.pose.to_matrix() * self.mount;
        let extrinsic_inv = inverse_extrinsic(&extrinsic);

        let mut candidates = snapshot.actors.clone();
        if let Some(max_distance) = self.filter.max_actor_distance {
            filter_by_distance(&mut candidates, &snapshot.ego.pose.location, max_distance);
        }

        let observed: Result<Vec<Option<Observation>>, ValidationError> = candidates
            .par_iter()
            .map(|actor| self.observe(actor, snapshot, &extrinsic_inv))
            .collect();
        let observations: Vec<Observation> = observed?.into_iter().flatten().collect();

        debug!(
            candidates = candidates.len(),
            visible = observations.len(),
            "built frame observations"
        );
        Ok(observations)
    }

    /// One actor through the full chain. `Ok(None)` means the actor is
    /// unlabeled (unknown class) or failed the visibility policy.
    fn observe(
        &self,
        actor: &ActorState,
        snapshot: &FrameSnapshot,
        extrinsic_inv: &Matrix4<f64>,
    ) -> Result<Option<Observation>, ValidationError> {
        let Some(class) = ObjectClass::from_type_id(&actor.type_id) else {
            return Ok(None);
        };

        let mut midpoint = world_to_camera(&actor.pose.location, extrinsic_inv);
        let rotation_y =
            relative_yaw(actor.pose.rotation.yaw, snapshot.ego.pose.rotation.yaw).rem_euclid(PI);

        let extent = actor.bounding_box.extent;
        let full_size = [2.0 * extent.x, 2.0 * extent.y, 2.0 * extent.z];

        // Detection geometry uses the box-center midpoint; the vehicle
        // bottom-reference raise below must not affect it.
        let mut detection = DetectionRecord::new(class, extent);
        detection.set_location([midpoint.x, midpoint.y, midpoint.z]);
        detection.set_rotation_y(rotation_y)?;

        let location = actor.pose.location;
        let mut translation = [-location.x, location.y, location.z];
        if class == ObjectClass::Car {
            translation[2] += full_size[2] / 2.0;
            midpoint.z += full_size[2] / 2.0;
        }

        let box_rotation = quaternion_to_matrix(&euler_to_quaternion(
            0.0,
            rotation_y,
            0.0,
            AngleUnit::Radians,
            Handedness::Flip,
        ));
        let counting_box = OrientedBox::new(midpoint, box_rotation, full_size);
        let num_lidar_pts = count_points_in_box(&snapshot.lidar, &counting_box);

        let visibility: Option<Visibility> = match self.filter.policy {
            VisibilityPolicy::Lidar => lidar_visibility(num_lidar_pts, &self.filter),
            VisibilityPolicy::Depth => {
                let depth_image = snapshot
                    .depth
                    .as_ref()
                    .ok_or(ValidationError::MissingDepthBuffer)?;
                let vertices = project_bounding_box(
                    &actor.bounding_box,
                    &actor.pose,
                    extrinsic_inv,
                    &self.intrinsic,
                );
                depth_visibility(&vertices, depth_image, &self.filter).map(|mut vis| {
                    vis.num_lidar_pts = num_lidar_pts;
                    vis
                })
            }
        };
        let Some(visibility) = visibility else {
            return Ok(None);
        };

        detection.set_truncation(visibility.truncation)?;
        detection.set_occlusion(visibility.occlusion)?;
        if let Some(bbox) = visibility.bbox_2d {
            detection.set_bbox(bbox);
        }

        let rotation = euler_to_quaternion(
            actor.pose.rotation.pitch,
            actor.pose.rotation.yaw + 180.0,
            actor.pose.rotation.roll,
            AngleUnit::Degrees,
            Handedness::Flip,
        );
        let annotation = AnnotationDescriptor::new(
            actor.id,
            class,
            translation,
            [full_size[1], full_size[0], full_size[2]],
            rotation,
            visibility.num_lidar_pts,
        );
        let kinematic = KinematicRecord::new(
            class,
            actor.velocity,
            actor.acceleration,
            actor.angular_velocity,
        );

        Ok(Some(Observation {
            detection,
            kinematic,
            annotation,
        }))
    }
}

// ===== Tests =====
