//! Per-actor output records.
//!
//! Three descriptors are produced for every visible actor:
//!
//! - [`DetectionRecord`]: the flat detection-label line (type, truncation,
//!   occlusion, box geometry in the camera frame).
//! - [`KinematicRecord`]: the motion side channel (velocity, acceleration,
//!   angular velocity).
//! - [`AnnotationDescriptor`]: the dataset-format annotation payload the
//!   token graph links into instances and samples.
//!
//! Setters validate their domains eagerly; a record that exists is a
//! record that can be written.

pub mod dataset;
pub mod detection;
pub mod kinematic;

pub use dataset::AnnotationDescriptor;
pub use detection::DetectionRecord;
pub use kinematic::KinematicRecord;

use std::fmt;

/// Object classes the exporter labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Car,
    Pedestrian,
}

impl ObjectClass {
    /// Class from a simulator blueprint id. Walkers take precedence,
    /// then vehicles; anything else is skipped entirely.
    pub fn from_type_id(type_id: &str) -> Option<Self> {
        if type_id.contains("walker") {
            return Some(ObjectClass::Pedestrian);
        }
        if type_id.contains("vehicle") {
            return Some(ObjectClass::Car);
        }
        None
    }

    /// Label used in detection and kinematic lines.
    pub fn label(&self) -> &'static str {
        match self {
            ObjectClass::Car => "Car",
            ObjectClass::Pedestrian => "Pedestrian",
        }
    }

    /// Dataset category name resolved through the category table.
    pub fn category_name(&self) -> &'static str {
        match self {
            ObjectClass::Car => "vehicle.car",
            ObjectClass::Pedestrian => "human.pedestrian.adult",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ===== Tests =====
