//! Token graph assembly.
//!
//! [`TokenGraphBuilder`] owns every cross-record link in the relational
//! output. It runs a small lifecycle per scene (open, append samples
//! and their data, close) plus a run-wide `finalize`, and it maintains
//! three kinds of doubly linked chains:
//!
//! - samples within a scene,
//! - sample-data per sensor across the whole run,
//! - annotations per instance across the whole run.
//!
//! Chains are written with a deferred tail: a record stays in memory
//! until its successor exists (fixing its `next` token) or the run
//! finalizes (leaving `next` empty). Every record therefore hits the
//! store exactly once, already complete.

use fxhash::FxHashMap;
use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::descriptor::AnnotationDescriptor;
use crate::error::GraphError;
use crate::geometry::{camera_intrinsic, euler_to_quaternion, AngleUnit, Handedness};
use crate::graph::records::{
    CalibratedSensorRecord, CategoryRecord, EgoPoseRecord, InstanceRecord, SampleAnnotationRecord,
    SampleDataRecord, SampleRecord, SceneRecord, SensorRecord,
};
use crate::graph::token::Token;
use crate::snapshot::{ActorId, Pose};
use crate::store::{Collection, JsonLog};

/// Scene lifecycle of the builder.
#[derive(Debug)]
enum GraphState {
    Idle,
    Open(OpenScene),
    Finalized,
}

/// Buffered state of the scene currently being captured.
#[derive(Debug)]
struct OpenScene {
    record: SceneRecord,
    samples: Vec<SampleRecord>,
    /// Pre-allocated token for the next sample to be appended. The
    /// first one doubles as the scene's `first_sample_token`.
    current_sample_token: Token,
    next_sample_token: Token,
    /// Token of the most recently appended sample; the attachment point
    /// for sample data and annotations.
    last_sample_token: Token,
    sample_count: u32,
}

/// One rig sensor with its pending sample-data chain tail.
#[derive(Debug)]
struct SensorSlot {
    record: SensorRecord,
    calibrated_token: Token,
    tail: Option<SampleDataRecord>,
}

/// One tracked actor with its pending annotation chain tail.
#[derive(Debug)]
struct InstanceSlot {
    record: InstanceRecord,
    tail: Option<SampleAnnotationRecord>,
}

/// Builds and persists the relational token graph for one run.
#[derive(Debug)]
pub struct TokenGraphBuilder {
    log: JsonLog,
    state: GraphState,
    /// Index of the next scene to open; names run `scene-0`, `scene-1`...
    scene_index: u32,
    sensors: Vec<SensorSlot>,
    /// Run-wide instance registry keyed by simulator actor id.
    instances: FxHashMap<ActorId, InstanceSlot>,
    categories: FxHashMap<String, Token>,
    /// Annotations whose successor exists, awaiting the per-scene flush.
    completed_annotations: Vec<SampleAnnotationRecord>,
}

impl TokenGraphBuilder {
    /// Sets up the store and writes the startup collections (sensors,
    /// calibrations, categories) derived from the rig configuration.
    pub fn new(log: JsonLog, config: &ExportConfig) -> crate::error::Result<Self> {
        let mut sensors = Vec::with_capacity(config.sensors.len());
        let mut calibrations = Vec::with_capacity(config.sensors.len());
        for sensor in &config.sensors {
            let sensor_token = Token::mint();
            let calibrated_token = Token::mint();
            let (width, height, intrinsic) = match sensor.attribute {
                Some(attribute) if sensor.is_camera() => {
                    let k = camera_intrinsic(
                        attribute.image_size_x,
                        attribute.image_size_y,
                        attribute.fov,
                    );
                    let rows: Vec<Vec<f64>> = (0..3)
                        .map(|r| (0..3).map(|c| k[(r, c)]).collect())
                        .collect();
                    (
                        Some(attribute.image_size_x),
                        Some(attribute.image_size_y),
                        rows,
                    )
                }
                _ => (None, None, Vec::new()),
            };
            let record = SensorRecord {
                token: sensor_token.clone(),
                channel: sensor.channel.clone(),
                modality: sensor.modality().to_string(),
                width,
                height,
            };
            calibrations.push(CalibratedSensorRecord {
                token: calibrated_token.clone(),
                sensor_token,
                translation: sensor.transform.location,
                rotation: sensor.transform.quat,
                camera_intrinsic: intrinsic,
            });
            sensors.push(SensorSlot {
                record,
                calibrated_token,
                tail: None,
            });
        }

        let category_records: Vec<CategoryRecord> = config
            .categories
            .iter()
            .map(|category| CategoryRecord {
                token: Token::from_value(category.token.clone()),
                name: category.name.clone(),
                description: String::new(),
            })
            .collect();
        let categories: FxHashMap<String, Token> = config
            .categories
            .iter()
            .map(|category| {
                (
                    category.name.clone(),
                    Token::from_value(category.token.clone()),
                )
            })
            .collect();

        log.initialize()?;
        let sensor_records: Vec<SensorRecord> =
            sensors.iter().map(|slot| slot.record.clone()).collect();
        log.write_collection(Collection::Sensor, &sensor_records)?;
        log.write_collection(Collection::CalibratedSensor, &calibrations)?;
        log.write_collection(Collection::Category, &category_records)?;
        info!(
            sensors = sensors.len(),
            categories = categories.len(),
            "token graph ready"
        );

        Ok(TokenGraphBuilder {
            log,
            state: GraphState::Idle,
            scene_index: 0,
            sensors,
            instances: FxHashMap::default(),
            categories,
            completed_annotations: Vec::new(),
        })
    }

    /// Opens the next scene, pre-allocating its first sample token.
    pub fn open_scene(&mut self) -> crate::error::Result<()> {
        match &self.state {
            GraphState::Open(_) => return Err(GraphError::SceneAlreadyOpen.into()),
            GraphState::Finalized => return Err(GraphError::Finalized.into()),
            GraphState::Idle => {}
        }
        let first_sample = Token::mint();
        let record = SceneRecord {
            token: Token::mint(),
            name: format!("scene-{}", self.scene_index),
            description: String::new(),
            nbr_samples: 0,
            first_sample_token: first_sample.clone(),
            last_sample_token: Token::none(),
        };
        info!(scene = %record.name, "opened scene");
        self.state = GraphState::Open(OpenScene {
            record,
            samples: Vec::new(),
            current_sample_token: first_sample,
            next_sample_token: Token::mint(),
            last_sample_token: Token::none(),
            sample_count: 0,
        });
        self.scene_index += 1;
        Ok(())
    }

    /// Appends a sample (one keyframe) to the open scene and returns its
    /// token. Sample data and annotations appended afterwards attach to
    /// it.
    pub fn append_sample(&mut self, timestamp: f64) -> crate::error::Result<Token> {
        let scene = self.open_scene_mut("append_sample")?;
        let token = scene.current_sample_token.clone();
        if let Some(previous) = scene.samples.last_mut() {
            previous.next = token.clone();
        }
        scene.samples.push(SampleRecord {
            token: token.clone(),
            timestamp,
            scene_token: scene.record.token.clone(),
            next: Token::none(),
            prev: scene.last_sample_token.clone(),
        });
        scene.last_sample_token = token.clone();
        scene.current_sample_token =
            std::mem::replace(&mut scene.next_sample_token, Token::mint());
        scene.sample_count += 1;
        debug!(sample = %token, "appended sample");
        Ok(token)
    }

    /// Records the ego pose for the current frame and returns its token.
    ///
    /// The translation takes the export-frame x flip; the rotation takes
    /// the half-turn yaw bias the export frame expects.
    pub fn append_ego_pose(&mut self, pose: &Pose, timestamp: f64) -> crate::error::Result<Token> {
        self.require_open("append_ego_pose")?;
        let token = Token::mint();
        let record = EgoPoseRecord {
            token: token.clone(),
            translation: [-pose.location.x, pose.location.y, pose.location.z],
            rotation: euler_to_quaternion(
                pose.rotation.pitch,
                pose.rotation.yaw + 180.0,
                pose.rotation.roll,
                AngleUnit::Degrees,
                Handedness::Flip,
            ),
            timestamp,
        };
        self.log.append(Collection::EgoPose, &record)?;
        Ok(token)
    }

    /// Appends one sample-data record per rig sensor for the current
    /// frame, attached to the last appended sample.
    ///
    /// Each sensor's previous record is flushed now with its `next`
    /// fixed; the new record becomes the sensor's pending tail.
    pub fn append_sample_data(
        &mut self,
        frame_id: u64,
        ego_pose_token: &Token,
        timestamp: f64,
    ) -> crate::error::Result<()> {
        let sample_token = self.last_sample_token("append_sample_data")?;
        let mut completed = Vec::new();
        for slot in &mut self.sensors {
            let (filename, fileformat) = if slot.record.modality == "lidar" {
                (format!("velodyne/{frame_id:06}.bin"), "pcd")
            } else {
                (
                    format!("image/{}/{frame_id:06}.png", slot.record.channel),
                    "jpg",
                )
            };
            let token = Token::mint();
            let prev = slot
                .tail
                .as_ref()
                .map(|tail| tail.token.clone())
                .unwrap_or_else(Token::none);
            let record = SampleDataRecord {
                token: token.clone(),
                sample_token: sample_token.clone(),
                ego_pose_token: ego_pose_token.clone(),
                calibrated_sensor_token: slot.calibrated_token.clone(),
                filename,
                fileformat: fileformat.to_string(),
                width: slot.record.width.unwrap_or(0),
                height: slot.record.height.unwrap_or(0),
                timestamp,
                is_key_frame: true,
                next: Token::none(),
                prev,
            };
            if let Some(mut tail) = slot.tail.take() {
                tail.next = token;
                completed.push(tail);
            }
            slot.tail = Some(record);
        }
        self.log.extend(Collection::SampleData, &completed)?;
        Ok(())
    }

    /// Links a frame's annotation descriptors into their instance chains
    /// under the last appended sample.
    ///
    /// New actors get a fresh instance; known actors extend their chain,
    /// releasing the predecessor annotation into the per-scene flush
    /// buffer with its `next` fixed.
    pub fn append_annotations(
        &mut self,
        descriptors: Vec<AnnotationDescriptor>,
    ) -> crate::error::Result<()> {
        let sample_token = self.last_sample_token("append_annotations")?;
        for descriptor in descriptors {
            let category_token = self
                .categories
                .get(&descriptor.category)
                .cloned()
                .ok_or_else(|| GraphError::UnknownCategory(descriptor.category.clone()))?;
            let token = Token::mint();
            let slot = self
                .instances
                .entry(descriptor.actor_id)
                .or_insert_with(|| InstanceSlot {
                    record: InstanceRecord {
                        carla_id: descriptor.actor_id,
                        token: Token::mint(),
                        category_token,
                        nbr_annotations: 0,
                        first_annotation_token: token.clone(),
                        last_annotation_token: Token::none(),
                    },
                    tail: None,
                });
            let prev = match slot.tail.take() {
                Some(mut tail) => {
                    let prev_token = tail.token.clone();
                    tail.next = token.clone();
                    self.completed_annotations.push(tail);
                    prev_token
                }
                None => Token::none(),
            };
            slot.record.nbr_annotations += 1;
            slot.record.last_annotation_token = token.clone();
            slot.tail = Some(SampleAnnotationRecord {
                token,
                sample_token: sample_token.clone(),
                instance_token: slot.record.token.clone(),
                attribute_tokens: Vec::new(),
                visibility_token: String::new(),
                translation: descriptor.translation,
                size: descriptor.size,
                rotation: descriptor.rotation,
                num_lidar_pts: descriptor.num_lidar_pts,
                num_radar_pts: 0,
                next: Token::none(),
                prev,
            });
        }
        Ok(())
    }

    /// Closes the open scene: fixes its sample count and last-sample
    /// link, then flushes the scene's samples, the completed
    /// annotations, and the scene record itself.
    pub fn close_scene(&mut self) -> crate::error::Result<()> {
        let scene = match std::mem::replace(&mut self.state, GraphState::Idle) {
            GraphState::Open(scene) => scene,
            GraphState::Idle => return Err(GraphError::NoOpenScene("close_scene").into()),
            GraphState::Finalized => {
                self.state = GraphState::Finalized;
                return Err(GraphError::Finalized.into());
            }
        };
        let mut record = scene.record;
        record.nbr_samples = scene.sample_count;
        record.last_sample_token = scene.last_sample_token;
        if scene.sample_count == 0 {
            // The pre-allocated first sample never materialized.
            record.first_sample_token = Token::none();
        }
        self.log.extend(Collection::Sample, &scene.samples)?;
        let annotations = std::mem::take(&mut self.completed_annotations);
        self.log.extend(Collection::SampleAnnotation, &annotations)?;
        self.log.append(Collection::Scene, &record)?;
        info!(scene = %record.name, samples = record.nbr_samples, "closed scene");
        Ok(())
    }

    /// Ends the run: closes any open scene, flushes every pending chain
    /// tail with an empty `next`, and writes the instance registry.
    /// Further operations are refused.
    pub fn finalize(&mut self) -> crate::error::Result<()> {
        if matches!(self.state, GraphState::Finalized) {
            return Err(GraphError::Finalized.into());
        }
        if matches!(self.state, GraphState::Open(_)) {
            self.close_scene()?;
        }

        let data_tails: Vec<SampleDataRecord> = self
            .sensors
            .iter_mut()
            .filter_map(|slot| slot.tail.take())
            .collect();
        self.log.extend(Collection::SampleData, &data_tails)?;

        let mut annotation_tails: Vec<(ActorId, SampleAnnotationRecord)> = self
            .instances
            .iter_mut()
            .filter_map(|(id, slot)| slot.tail.take().map(|tail| (*id, tail)))
            .collect();
        annotation_tails.sort_by_key(|(id, _)| *id);
        let annotation_tails: Vec<SampleAnnotationRecord> =
            annotation_tails.into_iter().map(|(_, tail)| tail).collect();
        self.log.extend(Collection::SampleAnnotation, &annotation_tails)?;

        let mut instance_records: Vec<&InstanceRecord> =
            self.instances.values().map(|slot| &slot.record).collect();
        instance_records.sort_by_key(|record| record.carla_id);
        self.log.extend(Collection::Instance, &instance_records)?;

        info!(instances = instance_records.len(), "finalized recording");
        self.state = GraphState::Finalized;
        Ok(())
    }

    fn require_open(&self, op: &'static str) -> Result<(), GraphError> {
        match &self.state {
            GraphState::Open(_) => Ok(()),
            GraphState::Idle => Err(GraphError::NoOpenScene(op)),
            GraphState::Finalized => Err(GraphError::Finalized),
        }
    }

    fn open_scene_mut(&mut self, op: &'static str) -> Result<&mut OpenScene, GraphError> {
        match &mut self.state {
            GraphState::Open(scene) => Ok(scene),
            GraphState::Idle => Err(GraphError::NoOpenScene(op)),
            GraphState::Finalized => Err(GraphError::Finalized),
        }
    }

    /// Token of the last appended sample in the open scene, the
    /// attachment point for frame-scoped records.
    fn last_sample_token(&self, op: &'static str) -> Result<Token, GraphError> {
        match &self.state {
            GraphState::Open(scene) => {
                if scene.last_sample_token.is_none() {
                    Err(GraphError::NoCurrentSample)
                } else {
                    Ok(scene.last_sample_token.clone())
                }
            }
            GraphState::Idle => Err(GraphError::NoOpenScene(op)),
            GraphState::Finalized => Err(GraphError::Finalized),
        }
    }
}

// ===== Tests =====
