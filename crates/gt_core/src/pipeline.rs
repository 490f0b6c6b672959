//! End-to-end export pipeline.
//!
//! [`Exporter`] wires the per-frame stages together: observation
//! extraction, flat label files, the can-bus trace, and the token
//! graph. Feed it one [`FrameSnapshot`] per simulator tick; it rotates
//! scenes after the configured sample count and finalizes the run once
//! the last scene closes.

use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::error::{GraphError, Result};
use crate::geometry::{euler_to_quaternion, AngleUnit, Handedness};
use crate::graph::{Token, TokenGraphBuilder};
use crate::observation::ObservationBuilder;
use crate::snapshot::FrameSnapshot;
use crate::store::{JsonLog, OutputLayout};

/// What one `process_frame` call produced.
#[derive(Debug, Clone)]
pub struct FrameSummary {
    /// Flat id the frame was written under.
    pub frame_id: u64,
    /// Token of the sample appended for the frame.
    pub sample_token: Token,
    /// Number of actors that passed the visibility filter.
    pub visible_actors: usize,
    /// True once the configured scene count is reached; later frames
    /// are refused.
    pub run_complete: bool,
}

/// Drives a full recording run.
pub struct Exporter {
    config: ExportConfig,
    layout: OutputLayout,
    graph: TokenGraphBuilder,
    observations: ObservationBuilder,
    /// Flat id of the next frame to capture.
    frame_id: u64,
    scenes_completed: u32,
    samples_in_scene: u32,
    finished: bool,
}

impl Exporter {
    /// Validates the configuration, prepares the output tree, writes
    /// the graph's startup collections and opens the first scene.
    pub fn new(config: ExportConfig) -> Result<Self> {
        config.validate()?;
        let layout = OutputLayout::new(&config.save.root_path);
        let camera_channels: Vec<&str> = config
            .sensors
            .iter()
            .filter(|sensor| sensor.is_camera())
            .map(|sensor| sensor.channel.as_str())
            .collect();
        layout.prepare(&camera_channels)?;
        let frame_id = layout.initial_frame_id(config.save.resume)?;

        let graph = TokenGraphBuilder::new(JsonLog::new(layout.dataset_dir()), &config)?;
        let observations = ObservationBuilder::new(&config)?;

        let mut exporter = Exporter {
            config,
            layout,
            graph,
            observations,
            frame_id,
            scenes_completed: 0,
            samples_in_scene: 0,
            finished: false,
        };
        exporter.graph.open_scene()?;
        info!(
            output = %exporter.layout.output_dir().display(),
            start_frame = exporter.frame_id,
            "export pipeline ready"
        );
        Ok(exporter)
    }

    /// Captures one frame: extracts observations, writes the frame's
    /// label files and can-bus line, and appends the frame to the token
    /// graph. Closes the scene (and possibly the run) when the sample
    /// quota is reached.
    pub fn process_frame(&mut self, snapshot: &FrameSnapshot) -> Result<FrameSummary> {
        if self.finished {
            return Err(GraphError::Finalized.into());
        }
        let observations = self.observations.build(snapshot)?;

        let frame_id = self.frame_id;
        let sample_token = self.graph.append_sample(snapshot.timestamp)?;
        let ego_pose_token = self
            .graph
            .append_ego_pose(&snapshot.ego.pose, snapshot.timestamp)?;
        self.graph
            .append_sample_data(frame_id, &ego_pose_token, snapshot.timestamp)?;

        let mut detections = Vec::with_capacity(observations.len());
        let mut kinematics = Vec::with_capacity(observations.len());
        let mut annotations = Vec::with_capacity(observations.len());
        for observation in observations {
            detections.push(observation.detection);
            kinematics.push(observation.kinematic);
            annotations.push(observation.annotation);
        }
        let visible_actors = detections.len();

        self.layout
            .write_label_file(&self.layout.detection_label_path(frame_id), &detections)?;
        self.layout
            .write_label_file(&self.layout.kinematic_label_path(frame_id), &kinematics)?;
        self.layout.append_ref_files(frame_id)?;
        self.write_can_bus_line(snapshot)?;

        self.graph.append_annotations(annotations)?;

        self.frame_id += 1;
        self.samples_in_scene += 1;
        debug!(frame = frame_id, visible = visible_actors, "captured frame");

        if self.samples_in_scene >= self.config.save.samples_per_scene {
            self.graph.close_scene()?;
            self.scenes_completed += 1;
            self.samples_in_scene = 0;
            if self.scenes_completed >= self.config.save.scene_count {
                self.graph.finalize()?;
                self.finished = true;
                info!(
                    scenes = self.scenes_completed,
                    next_frame = self.frame_id,
                    "recording complete"
                );
            } else {
                self.graph.open_scene()?;
                info!(scene = self.scenes_completed, "rotated to next scene");
            }
        }

        Ok(FrameSummary {
            frame_id,
            sample_token,
            visible_actors,
            run_complete: self.finished,
        })
    }

    /// Ends the run early, finalizing whatever has been captured.
    /// Calling it after the run already completed is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.graph.finalize()?;
        self.finished = true;
        info!(scenes = self.scenes_completed, "recording finished early");
        Ok(())
    }

    /// True once the run finalized, by quota or by [`Exporter::finish`].
    pub fn is_complete(&self) -> bool {
        self.finished
    }

    /// Flat id the next captured frame will be written under.
    pub fn next_frame_id(&self) -> u64 {
        self.frame_id
    }

    /// One line per frame: position, attitude quaternion and raw
    /// inertial readings, appended to the open scene's trace file.
    fn write_can_bus_line(&self, snapshot: &FrameSnapshot) -> Result<()> {
        let pose = &snapshot.ego.pose;
        let imu = &snapshot.ego.imu;
        let rotation = euler_to_quaternion(
            pose.rotation.pitch,
            pose.rotation.yaw,
            pose.rotation.roll,
            AngleUnit::Degrees,
            Handedness::Flip,
        );
        let values = [
            pose.location.x,
            pose.location.y,
            pose.location.z,
            rotation[0],
            rotation[1],
            rotation[2],
            rotation[3],
            imu.acceleration.x,
            imu.acceleration.y,
            imu.acceleration.z,
            imu.velocity.x,
            imu.velocity.y,
            imu.velocity.z,
            imu.angular_velocity.x,
            imu.angular_velocity.y,
            imu.angular_velocity.z,
        ];
        self.layout
            .append_can_bus_line(self.scenes_completed, &values)?;
        Ok(())
    }
}

// ===== Tests =====
