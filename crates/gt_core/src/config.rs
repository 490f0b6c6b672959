//! Static export configuration.
//!
//! One [`ExportConfig`] describes a whole run: the sensor rig (channels,
//! blueprints, mount transforms, camera attributes), the category table
//! mapping class names to dataset tokens, the visibility thresholds and
//! the save layout. Loaded from YAML, validated before anything touches
//! the filesystem.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ValidationError};
use crate::snapshot::{Pose, Rotation, Vec3};

/// How actor visibility is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityPolicy {
    /// Count lidar returns inside the actor's oriented box.
    #[default]
    Lidar,
    /// Project box vertices and test them against the camera depth image.
    Depth,
}

/// What to do when the output directory already holds captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResumePolicy {
    /// Start numbering at frame zero, overwriting previous label files.
    #[default]
    Overwrite,
    /// Continue numbering after the highest existing frame.
    Append,
}

/// Camera-specific lens attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraAttribute {
    pub image_size_x: u32,
    pub image_size_y: u32,
    /// Horizontal field of view in degrees.
    pub fov: f64,
}

/// Where a sensor sits on the ego body.
///
/// `rotation` is the mount orientation as pitch/yaw/roll degrees and
/// feeds the extrinsic chain. `quat` is the orientation written verbatim
/// into the calibrated-sensor record, `[w, x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MountTransform {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub quat: [f64; 4],
}

impl Default for MountTransform {
    /// Identity mount at the body origin.
    fn default() -> Self {
        MountTransform {
            location: [0.0; 3],
            rotation: [0.0; 3],
            quat: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

impl MountTransform {
    /// Mount pose for transform composition.
    pub fn pose(&self) -> Pose {
        Pose::new(
            Vec3::new(self.location[0], self.location[1], self.location[2]),
            Rotation::new(self.rotation[0], self.rotation[1], self.rotation[2]),
        )
    }
}

/// One sensor in the rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Dataset channel name, e.g. `CAM_FRONT` or `LIDAR_TOP`.
    pub channel: String,
    /// Simulator blueprint id, e.g. `sensor.camera.rgb`.
    pub blueprint: String,
    pub transform: MountTransform,
    /// Present for cameras only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<CameraAttribute>,
}

impl SensorConfig {
    /// Dataset modality, the second dot-segment of the blueprint id
    /// (`sensor.camera.rgb` yields `camera`).
    pub fn modality(&self) -> &str {
        self.blueprint.split('.').nth(1).unwrap_or("")
    }

    pub fn is_camera(&self) -> bool {
        self.modality() == "camera"
    }
}

/// Class name to dataset token, one row of the category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub token: String,
}

/// Visibility thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub policy: VisibilityPolicy,
    /// Depth beyond which a projected vertex counts as out of view, meters.
    pub max_render_depth: f64,
    /// Minimum in-view vertices for the depth policy to keep an actor.
    pub min_visible_vertices: u32,
    /// An actor with this many out-of-view vertices or more is dropped
    /// under the depth policy.
    pub max_out_vertices: u32,
    /// Minimum lidar returns inside the box for the lidar policy.
    pub min_lidar_points: u32,
    /// Planar distance pre-filter from the ego, meters. `None` disables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_actor_distance: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            policy: VisibilityPolicy::Lidar,
            max_render_depth: 70.0,
            min_visible_vertices: 4,
            max_out_vertices: 5,
            min_lidar_points: 10,
            max_actor_distance: None,
        }
    }
}

/// Output location and run extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveConfig {
    /// Dataset root. The `training` tree is created beneath it.
    pub root_path: PathBuf,
    /// Samples captured per scene before the scene is closed.
    pub samples_per_scene: u32,
    /// Scenes captured before the run finalizes.
    pub scene_count: u32,
    #[serde(default)]
    pub resume: ResumePolicy,
}

/// Complete configuration for an export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub sensors: Vec<SensorConfig>,
    pub categories: Vec<CategoryConfig>,
    /// Channel used for projection and detection records. Defaults to the
    /// first camera in `sensors`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_camera: Option<String>,
    #[serde(default)]
    pub filter: FilterConfig,
    pub save: SaveConfig,
}

impl ExportConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ExportError> {
        let config: ExportConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ExportError> {
        let text = std::fs::read_to_string(path).map_err(crate::error::StoreError::from)?;
        Self::from_yaml_str(&text)
    }

    /// Checks every value against its documented domain. Called by the
    /// exporter before any directory is created.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sensors.is_empty() {
            return Err(ValidationError::InvalidConfig(
                "at least one sensor is required".to_string(),
            ));
        }

        for sensor in &self.sensors {
            let modality = sensor.modality();
            if modality != "camera" && modality != "lidar" {
                return Err(ValidationError::InvalidSensor {
                    channel: sensor.channel.clone(),
                    reason: format!("unsupported modality '{modality}'"),
                });
            }
            let duplicates = self
                .sensors
                .iter()
                .filter(|other| other.channel == sensor.channel)
                .count();
            if duplicates > 1 {
                return Err(ValidationError::InvalidSensor {
                    channel: sensor.channel.clone(),
                    reason: "duplicate channel name".to_string(),
                });
            }
            if sensor.is_camera() {
                let attr = sensor.attribute.ok_or_else(|| ValidationError::InvalidSensor {
                    channel: sensor.channel.clone(),
                    reason: "camera sensor is missing its attribute block".to_string(),
                })?;
                if attr.image_size_x == 0 || attr.image_size_y == 0 {
                    return Err(ValidationError::InvalidSensor {
                        channel: sensor.channel.clone(),
                        reason: "image size must be non-zero".to_string(),
                    });
                }
                if !(attr.fov > 0.0 && attr.fov < 180.0) {
                    return Err(ValidationError::InvalidSensor {
                        channel: sensor.channel.clone(),
                        reason: format!("fov {} outside (0, 180)", attr.fov),
                    });
                }
            }
        }

        if self.reference_camera().is_none() {
            return Err(ValidationError::InvalidConfig(
                "no camera sensor available for projection".to_string(),
            ));
        }

        if self.categories.is_empty() {
            return Err(ValidationError::InvalidConfig(
                "category table must not be empty".to_string(),
            ));
        }
        for category in &self.categories {
            if category.token.is_empty() {
                return Err(ValidationError::InvalidConfig(format!(
                    "category '{}' has an empty token",
                    category.name
                )));
            }
        }

        let filter = &self.filter;
        if filter.max_render_depth <= 0.0 {
            return Err(ValidationError::InvalidConfig(format!(
                "max_render_depth {} must be positive",
                filter.max_render_depth
            )));
        }
        if !(1..=8).contains(&filter.min_visible_vertices) {
            return Err(ValidationError::InvalidConfig(format!(
                "min_visible_vertices {} outside 1..=8 (a box has 8 vertices)",
                filter.min_visible_vertices
            )));
        }
        if !(1..=8).contains(&filter.max_out_vertices) {
            return Err(ValidationError::InvalidConfig(format!(
                "max_out_vertices {} outside 1..=8",
                filter.max_out_vertices
            )));
        }
        if filter.min_lidar_points == 0 {
            return Err(ValidationError::InvalidConfig(
                "min_lidar_points must be at least 1".to_string(),
            ));
        }
        if let Some(distance) = filter.max_actor_distance {
            if distance <= 0.0 {
                return Err(ValidationError::InvalidConfig(format!(
                    "max_actor_distance {distance} must be positive"
                )));
            }
        }

        if self.save.samples_per_scene == 0 {
            return Err(ValidationError::InvalidConfig(
                "samples_per_scene must be at least 1".to_string(),
            ));
        }
        if self.save.scene_count == 0 {
            return Err(ValidationError::InvalidConfig(
                "scene_count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// The sensor whose frame detections are expressed in: the configured
    /// `reference_camera` channel, or the first camera in the rig.
    pub fn reference_camera(&self) -> Option<&SensorConfig> {
        match &self.reference_camera {
            Some(channel) => self
                .sensors
                .iter()
                .find(|s| &s.channel == channel && s.is_camera()),
            None => self.sensors.iter().find(|s| s.is_camera()),
        }
    }

    /// Token for a category name, if the table knows it.
    pub fn category_token(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.token.as_str())
    }
}

// ===== Tests =====
