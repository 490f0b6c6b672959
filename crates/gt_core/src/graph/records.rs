//! Serialized record shapes of the relational output.
//!
//! One struct per collection file. Field sets and names are the output
//! format contract; changing them changes what consumers parse.

use serde::{Deserialize, Serialize};

use crate::graph::token::Token;
use crate::snapshot::ActorId;

/// `sensor.json` entry: one rig sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub token: Token,
    pub channel: String,
    pub modality: String,
    /// Cameras only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// `calibrated_sensor.json` entry: a sensor's mount calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedSensorRecord {
    pub token: Token,
    pub sensor_token: Token,
    pub translation: [f64; 3],
    /// `[w, x, y, z]`, straight from the rig configuration.
    pub rotation: [f64; 4],
    /// Three rows of three for cameras, empty for lidar.
    pub camera_intrinsic: Vec<Vec<f64>>,
}

/// `category.json` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub token: Token,
    pub name: String,
    pub description: String,
}

/// `ego_pose.json` entry: the ego vehicle at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgoPoseRecord {
    pub token: Token,
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub timestamp: f64,
}

/// `scene.json` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub token: Token,
    pub name: String,
    pub description: String,
    pub nbr_samples: u32,
    pub first_sample_token: Token,
    pub last_sample_token: Token,
}

/// `sample.json` entry: one keyframe, doubly linked within its scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub token: Token,
    pub timestamp: f64,
    pub scene_token: Token,
    pub next: Token,
    pub prev: Token,
}

/// `sample_data.json` entry: one sensor capture, doubly linked per
/// sensor across the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDataRecord {
    pub token: Token,
    pub sample_token: Token,
    pub ego_pose_token: Token,
    pub calibrated_sensor_token: Token,
    /// Relative path under the output tree.
    pub filename: String,
    pub fileformat: String,
    pub width: u32,
    pub height: u32,
    pub timestamp: f64,
    pub is_key_frame: bool,
    pub next: Token,
    pub prev: Token,
}

/// `sample_annotation.json` entry: one actor in one sample, doubly
/// linked along its instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAnnotationRecord {
    pub token: Token,
    pub sample_token: Token,
    pub instance_token: Token,
    pub attribute_tokens: Vec<String>,
    pub visibility_token: String,
    pub translation: [f64; 3],
    pub size: [f64; 3],
    pub rotation: [f64; 4],
    pub num_lidar_pts: u32,
    pub num_radar_pts: u32,
    pub next: Token,
    pub prev: Token,
}

/// `instance.json` entry: one physical actor across the run.
///
/// `carla_id` is the simulator's stable actor id, kept in the record for
/// traceability back to the source world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub carla_id: ActorId,
    pub token: Token,
    pub category_token: Token,
    pub nbr_annotations: u32,
    pub first_annotation_token: Token,
    pub last_annotation_token: Token,
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_record_omits_camera_fields_for_lidar() {
        let record = SensorRecord {
            token: Token::from_value("t"),
            channel: "LIDAR_TOP".to_string(),
            modality: "lidar".to_string(),
            width: None,
            height: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("width").is_none(), "lidar sensors have no width field");
        assert_eq!(json["modality"], "lidar");
    }

    #[test]
    fn test_annotation_record_field_set() {
        let record = SampleAnnotationRecord {
            token: Token::from_value("a"),
            sample_token: Token::from_value("s"),
            instance_token: Token::from_value("i"),
            attribute_tokens: Vec::new(),
            visibility_token: String::new(),
            translation: [1.0, 2.0, 3.0],
            size: [2.0, 4.0, 1.5],
            rotation: [1.0, 0.0, 0.0, 0.0],
            num_lidar_pts: 11,
            num_radar_pts: 0,
            next: Token::none(),
            prev: Token::none(),
        };
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        for field in [
            "token",
            "sample_token",
            "instance_token",
            "attribute_tokens",
            "visibility_token",
            "translation",
            "size",
            "rotation",
            "num_lidar_pts",
            "num_radar_pts",
            "next",
            "prev",
        ] {
            assert!(object.contains_key(field), "missing field {field}");
        }
        assert_eq!(json["next"], "");
        assert_eq!(json["num_radar_pts"], 0);
    }

    #[test]
    fn test_instance_record_exposes_actor_id_as_number() {
        let record = InstanceRecord {
            carla_id: ActorId(261),
            token: Token::from_value("i"),
            category_token: Token::from_value("c"),
            nbr_annotations: 3,
            first_annotation_token: Token::from_value("f"),
            last_annotation_token: Token::from_value("l"),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["carla_id"], 261);
    }

    #[test]
    fn test_sample_data_round_trips() {
        let record = SampleDataRecord {
            token: Token::mint(),
            sample_token: Token::mint(),
            ego_pose_token: Token::mint(),
            calibrated_sensor_token: Token::mint(),
            filename: "velodyne/000007.bin".to_string(),
            fileformat: "pcd".to_string(),
            width: 0,
            height: 0,
            timestamp: 3.25,
            is_key_frame: true,
            next: Token::none(),
            prev: Token::mint(),
        };
        let text = serde_json::to_string(&record).unwrap();
        let back: SampleDataRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }
}
