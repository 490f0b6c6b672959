//! # gt_core - Ground Truth Dataset Export Engine
//!
//! This library turns per-frame simulator snapshots into a navigable
//! ground-truth dataset: flat detection and kinematic label files per
//! frame, a relational token graph of scenes, samples, sensor data and
//! instance annotations, and a per-scene can-bus trace of the ego
//! vehicle.
//!
//! ## Features
//! - Two visibility policies: lidar return counting and depth-buffer probing
//! - Doubly linked sample, sample-data and annotation chains, each record
//!   written exactly once
//! - Crash-safe collection writes (tmp file + rename)
//! - Resumable flat-file numbering for interrupted recordings

pub mod config;
pub mod descriptor;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod observation;
pub mod pipeline;
pub mod snapshot;
pub mod store;
pub mod visibility;

// Re-export the error hierarchy
pub use error::{ExportError, GraphError, Result, StoreError, ValidationError};

// Re-export configuration types
pub use config::{
    CameraAttribute, CategoryConfig, ExportConfig, FilterConfig, MountTransform, ResumePolicy,
    SaveConfig, SensorConfig, VisibilityPolicy,
};

// Re-export frame input types
pub use snapshot::{
    ActorId, ActorState, BoundingBox, DepthBuffer, EgoState, FrameSnapshot, ImuSample, Pose,
    Rotation, Vec3,
};

// Re-export per-frame observation outputs
pub use descriptor::{AnnotationDescriptor, DetectionRecord, KinematicRecord, ObjectClass};
pub use observation::{Observation, ObservationBuilder};

// Re-export the token graph
pub use graph::{Token, TokenGraphBuilder};

// Re-export storage and the pipeline
pub use pipeline::{Exporter, FrameSummary};
pub use store::{JsonLog, OutputLayout};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        EgoPoseRecord, InstanceRecord, SampleAnnotationRecord, SampleDataRecord, SampleRecord,
        SceneRecord,
    };
    use crate::store::Collection;
    use std::path::Path;
    use tempfile::TempDir;

    fn recording_yaml(root: &Path, filter: &str) -> String {
        format!(
            r#"
sensors:
  - channel: CAM_FRONT
    blueprint: sensor.camera.rgb
    transform:
      location: [0.0, 0.0, 0.0]
      rotation: [0.0, 0.0, 0.0]
      quat: [1.0, 0.0, 0.0, 0.0]
    attribute:
      image_size_x: 1600
      image_size_y: 900
      fov: 90.0
  - channel: LIDAR_TOP
    blueprint: sensor.lidar.ray_cast
    transform:
      location: [0.0, 0.0, 0.0]
      rotation: [0.0, 0.0, 0.0]
      quat: [1.0, 0.0, 0.0, 0.0]
categories:
  - name: vehicle.car
    token: cat-vehicle-car
  - name: human.pedestrian.adult
    token: cat-pedestrian-adult
{filter}save:
  root_path: {root}
  samples_per_scene: 2
  scene_count: 1
"#,
            filter = filter,
            root = root.display(),
        )
    }

    /// One car ten meters ahead of a stationary ego, carrying a dozen
    /// lidar returns.
    fn car_snapshot(timestamp: f64, with_depth: bool) -> FrameSnapshot {
        let cloud: Vec<[f32; 3]> = (0..12)
            .map(|i| [9.5 + 0.1 * i as f32, -0.2, 0.75])
            .collect();
        FrameSnapshot {
            timestamp,
            ego: EgoState::default(),
            actors: vec![ActorState {
                id: ActorId(42),
                type_id: "vehicle.tesla.model3".to_string(),
                pose: Pose::new(Vec3::new(10.0, 0.0, 0.0), Rotation::default()),
                bounding_box: BoundingBox {
                    extent: Vec3::new(2.0, 1.0, 0.75),
                    local: Pose::default(),
                },
                velocity: Vec3::new(3.0, 0.0, 0.0),
                acceleration: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
            }],
            lidar: cloud,
            depth: with_depth.then(|| DepthBuffer::filled(1600, 900, 1000.0)),
        }
    }

    #[test]
    fn test_full_recording_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = ExportConfig::from_yaml_str(&recording_yaml(dir.path(), "")).unwrap();
        let mut exporter = Exporter::new(config).unwrap();

        let first = exporter.process_frame(&car_snapshot(0.05, false)).unwrap();
        assert_eq!(first.visible_actors, 1);
        assert!(!first.run_complete);
        let second = exporter.process_frame(&car_snapshot(0.10, false)).unwrap();
        assert!(second.run_complete, "one scene of two samples fills the run");
        assert!(exporter.is_complete());

        let log = JsonLog::new(dir.path().join("training/mini"));

        let scenes: Vec<SceneRecord> = log.read(Collection::Scene).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].nbr_samples, 2);
        assert_eq!(scenes[0].first_sample_token, first.sample_token);
        assert_eq!(scenes[0].last_sample_token, second.sample_token);

        let samples: Vec<SampleRecord> = log.read(Collection::Sample).unwrap();
        assert_eq!(samples.len(), 2);
        let head = samples.iter().find(|s| s.token == first.sample_token).unwrap();
        let tail = samples.iter().find(|s| s.token == second.sample_token).unwrap();
        assert!(head.prev.is_none());
        assert_eq!(head.next, tail.token);
        assert_eq!(tail.prev, head.token);
        assert!(tail.next.is_none());
        assert_eq!(head.timestamp, 0.05);

        // Two sensors, two frames: four data records in per-sensor chains.
        let data: Vec<SampleDataRecord> = log.read(Collection::SampleData).unwrap();
        assert_eq!(data.len(), 4);
        for frame_records in [
            Box::new(data.iter().filter(|d| d.sample_token == head.token))
                as Box<dyn Iterator<Item = &SampleDataRecord> + '_>,
            Box::new(data.iter().filter(|d| d.sample_token == tail.token)),
        ] {
            assert_eq!(frame_records.count(), 2);
        }
        let lidar_head = data
            .iter()
            .find(|d| d.fileformat == "pcd" && d.prev.is_none())
            .unwrap();
        let lidar_tail = data
            .iter()
            .find(|d| d.fileformat == "pcd" && d.next.is_none())
            .unwrap();
        assert_eq!(lidar_head.next, lidar_tail.token);
        assert_eq!(lidar_tail.prev, lidar_head.token);
        assert_eq!(lidar_head.filename, "velodyne/000000.bin");
        assert_eq!(lidar_tail.filename, "velodyne/000001.bin");

        let ego_poses: Vec<EgoPoseRecord> = log.read(Collection::EgoPose).unwrap();
        assert_eq!(ego_poses.len(), 2);
        assert!(data.iter().all(|d| ego_poses.iter().any(|e| e.token == d.ego_pose_token)));

        // The car is one instance with a two-annotation chain.
        let instances: Vec<InstanceRecord> = log.read(Collection::Instance).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].carla_id, ActorId(42));
        assert_eq!(instances[0].nbr_annotations, 2);
        assert_eq!(instances[0].category_token.as_str(), "cat-vehicle-car");

        let annotations: Vec<SampleAnnotationRecord> =
            log.read(Collection::SampleAnnotation).unwrap();
        assert_eq!(annotations.len(), 2);
        let first_annotation = annotations
            .iter()
            .find(|a| a.token == instances[0].first_annotation_token)
            .unwrap();
        let last_annotation = annotations
            .iter()
            .find(|a| a.token == instances[0].last_annotation_token)
            .unwrap();
        assert_eq!(first_annotation.next, last_annotation.token);
        assert_eq!(last_annotation.prev, first_annotation.token);
        assert_eq!(first_annotation.sample_token, head.token);
        assert_eq!(last_annotation.sample_token, tail.token);
        // Export frame flips x; the box center rides at half height.
        assert_eq!(first_annotation.translation, [-10.0, 0.0, 0.75]);
        assert_eq!(first_annotation.size, [2.0, 4.0, 1.5]);
        assert_eq!(first_annotation.num_lidar_pts, 12);

        // Flat files alongside the graph.
        let output = dir.path().join("training");
        for frame in ["000000", "000001"] {
            let label =
                std::fs::read_to_string(output.join(format!("kitti_label/{frame}.txt"))).unwrap();
            assert!(label.starts_with("Car "), "unexpected label: {label}");
            assert!(output.join(format!("carla_label/{frame}.txt")).is_file());
        }
        let trainval = std::fs::read_to_string(output.join("trainval.txt")).unwrap();
        assert_eq!(trainval, "000000\n000001\n");
        let can_bus =
            std::fs::read_to_string(output.join("can_bus/scene_000000.txt")).unwrap();
        assert_eq!(can_bus.lines().count(), 2);
    }

    #[test]
    fn test_depth_policy_round_trip() {
        let dir = TempDir::new().unwrap();
        let filter = "filter:\n  policy: depth\n  max_render_depth: 70.0\n  min_visible_vertices: 4\n  max_out_vertices: 5\n  min_lidar_points: 10\n";
        let config = ExportConfig::from_yaml_str(&recording_yaml(dir.path(), filter)).unwrap();
        let mut exporter = Exporter::new(config).unwrap();

        let summary = exporter.process_frame(&car_snapshot(0.05, true)).unwrap();
        assert_eq!(summary.visible_actors, 1);

        // An open depth buffer leaves the whole box unoccluded.
        let label = std::fs::read_to_string(
            dir.path().join("training/kitti_label/000000.txt"),
        )
        .unwrap();
        let fields: Vec<&str> = label.split_whitespace().collect();
        assert_eq!(fields[0], "Car");
        assert_eq!(fields[1], "0", "truncation");
        assert_eq!(fields[2], "0", "occlusion tier");
        // A projected box is present (four bbox fields before the dims).
        assert_eq!(fields.len(), 15);

        // The lidar count still rides along under the depth policy.
        let log = JsonLog::new(dir.path().join("training/mini"));
        let annotations: Vec<SampleAnnotationRecord> =
            log.read(Collection::SampleAnnotation).unwrap();
        assert_eq!(annotations[0].num_lidar_pts, 12);
    }

    #[test]
    fn test_depth_policy_requires_buffer() {
        let dir = TempDir::new().unwrap();
        let filter = "filter:\n  policy: depth\n  max_render_depth: 70.0\n  min_visible_vertices: 4\n  max_out_vertices: 5\n  min_lidar_points: 10\n";
        let config = ExportConfig::from_yaml_str(&recording_yaml(dir.path(), filter)).unwrap();
        let mut exporter = Exporter::new(config).unwrap();

        let err = exporter.process_frame(&car_snapshot(0.05, false)).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Validation(ValidationError::MissingDepthBuffer)
        ));
    }
}
