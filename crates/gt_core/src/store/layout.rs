//! Output tree layout and flat-file writers.
//!
//! The dataset root grows a `training` tree:
//!
//! ```text
//! <root>/training/
//!   calib/            reserved for calibration text files
//!   image/<CHANNEL>/  camera captures (written by the host)
//!   velodyne/         lidar captures (written by the host)
//!   kitti_label/      one detection-label file per frame
//!   carla_label/      one kinematic-label file per frame
//!   can_bus/          one pose/IMU log per scene
//!   mini/             the relational JSON collections
//!   train.txt val.txt trainval.txt   frame-id reference lists
//! ```
//!
//! Frame numbering is six-digit and zero-padded everywhere. The layout
//! also answers how many frames a previous run left behind, which drives
//! the resume policy.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::ResumePolicy;
use crate::error::StoreError;

/// Phase directory under the dataset root.
pub const PHASE: &str = "training";
/// Relational collection directory under the phase tree.
pub const DATASET_DIR: &str = "mini";

const REF_FILES: [&str; 3] = ["train.txt", "val.txt", "trainval.txt"];

/// Paths of one export run's output tree.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    output: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path) -> Self {
        OutputLayout {
            output: root.join(PHASE),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Directory holding the relational JSON collections.
    pub fn dataset_dir(&self) -> PathBuf {
        self.output.join(DATASET_DIR)
    }

    /// Creates the full folder tree, including one image subfolder per
    /// camera channel.
    pub fn prepare(&self, camera_channels: &[&str]) -> Result<(), StoreError> {
        let folders = [
            "calib",
            "image",
            "kitti_label",
            "carla_label",
            "velodyne",
            "can_bus",
            DATASET_DIR,
        ];
        for folder in folders {
            fs::create_dir_all(self.output.join(folder))?;
        }
        for channel in camera_channels {
            fs::create_dir_all(self.output.join("image").join(channel))?;
        }
        debug!("Prepared output tree at {}", self.output.display());
        Ok(())
    }

    pub fn detection_label_path(&self, frame_id: u64) -> PathBuf {
        self.output.join("kitti_label").join(format!("{frame_id:06}.txt"))
    }

    pub fn kinematic_label_path(&self, frame_id: u64) -> PathBuf {
        self.output.join("carla_label").join(format!("{frame_id:06}.txt"))
    }

    pub fn can_bus_path(&self, scene_id: u32) -> PathBuf {
        self.output.join("can_bus").join(format!("scene_{scene_id:06}.txt"))
    }

    /// Number of frames captured by previous runs, counted from the
    /// detection label files.
    pub fn captured_frame_count(&self) -> Result<u64, StoreError> {
        let label_dir = self.output.join("kitti_label");
        if !label_dir.exists() {
            return Ok(0);
        }
        let count = fs::read_dir(label_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().map(|ext| ext == "txt").unwrap_or(false)
            })
            .count();
        Ok(count as u64)
    }

    /// First frame id for this run under the given resume policy.
    pub fn initial_frame_id(&self, resume: ResumePolicy) -> Result<u64, StoreError> {
        match resume {
            ResumePolicy::Overwrite => Ok(0),
            ResumePolicy::Append => self.captured_frame_count(),
        }
    }

    /// Writes one record per line to a label file. An empty record set
    /// still produces the file, so frame numbering stays dense.
    pub fn write_label_file<D: fmt::Display>(
        &self,
        path: &Path,
        records: &[D],
    ) -> Result<(), StoreError> {
        let lines: Vec<String> = records.iter().map(|r| r.to_string()).collect();
        fs::write(path, lines.join("\n"))?;
        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }

    /// Appends the frame id to the train/val/trainval reference lists.
    pub fn append_ref_files(&self, frame_id: u64) -> Result<(), StoreError> {
        for name in REF_FILES {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.output.join(name))?;
            writeln!(file, "{frame_id:06}")?;
        }
        Ok(())
    }

    /// Appends one line of comma-separated values to the scene's CAN bus
    /// log.
    pub fn append_can_bus_line(&self, scene_id: u32, values: &[f64]) -> Result<(), StoreError> {
        let line = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.can_bus_path(scene_id))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

// ===== Tests =====
