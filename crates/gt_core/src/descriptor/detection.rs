//! Flat detection-label record.
//!
//! One line per visible actor in the per-frame label file:
//!
//! ```text
//! type truncated occluded alpha bbox dimensions location rotation_y
//! ```
//!
//! with `bbox` as four pixel bounds or a single space when no projected
//! box exists, `dimensions` as full height/width/length and `location`
//! as the box midpoint permuted into the label's camera axes.

use std::f64::consts::PI;
use std::fmt;

use crate::descriptor::ObjectClass;
use crate::error::ValidationError;
use crate::snapshot::Vec3;

/// Sentinel for an observation angle the pipeline does not compute.
const ALPHA_UNSET: f64 = -10.0;

/// Detection-label line for one actor.
///
/// Construction takes the class and box extent up front, so dimension
/// data is always present when the location setter needs it for the
/// pedestrian height adjustment. Range-checked fields go through
/// fallible setters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    class: ObjectClass,
    truncated: f64,
    occluded: u8,
    alpha: f64,
    bbox: Option<[i32; 4]>,
    /// Half extents as (height, width, length).
    half_extent: (f64, f64, f64),
    /// Midpoint permuted to (y, -z, x) of the sensor frame.
    location: [f64; 3],
    rotation_y: f64,
}

impl DetectionRecord {
    /// New record for an actor with the given box half-extents.
    ///
    /// The engine orders extents (x, y, z) = (length, width, height);
    /// the label wants (height, width, length).
    pub fn new(class: ObjectClass, extent: Vec3) -> Self {
        DetectionRecord {
            class,
            truncated: 0.0,
            occluded: 0,
            alpha: ALPHA_UNSET,
            bbox: None,
            half_extent: (extent.z, extent.x, extent.y),
            location: [0.0; 3],
            rotation_y: 0.0,
        }
    }

    pub fn set_truncation(&mut self, value: f64) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::InvalidTruncation(value));
        }
        self.truncated = value;
        Ok(())
    }

    pub fn set_occlusion(&mut self, tier: u8) -> Result<(), ValidationError> {
        if tier > 3 {
            return Err(ValidationError::InvalidOcclusion(tier));
        }
        self.occluded = tier;
        Ok(())
    }

    pub fn set_alpha(&mut self, value: f64) -> Result<(), ValidationError> {
        if !(-PI..=PI).contains(&value) {
            return Err(ValidationError::InvalidAlpha(value));
        }
        self.alpha = value;
        Ok(())
    }

    pub fn set_bbox(&mut self, bbox: [i32; 4]) {
        self.bbox = Some(bbox);
    }

    /// Box midpoint in the sensor frame.
    ///
    /// Pedestrian midpoints are lowered by the half height before the
    /// axis permutation, moving the reference from box center to foot
    /// level.
    pub fn set_location(&mut self, midpoint: [f64; 3]) {
        let (x, y, mut z) = (midpoint[0], midpoint[1], midpoint[2]);
        if self.class == ObjectClass::Pedestrian {
            z -= self.half_extent.0;
        }
        self.location = [y, -z, x];
    }

    pub fn set_rotation_y(&mut self, value: f64) -> Result<(), ValidationError> {
        if !(-PI..=PI).contains(&value) {
            return Err(ValidationError::InvalidRotationY(value));
        }
        self.rotation_y = value;
        Ok(())
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    pub fn truncation(&self) -> f64 {
        self.truncated
    }

    pub fn occlusion(&self) -> u8 {
        self.occluded
    }

    pub fn bbox(&self) -> Option<[i32; 4]> {
        self.bbox
    }

    pub fn location(&self) -> [f64; 3] {
        self.location
    }

    pub fn rotation_y(&self) -> f64 {
        self.rotation_y
    }
}

impl fmt::Display for DetectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bbox = match self.bbox {
            Some([x1, y1, x2, y2]) => format!("{x1} {y1} {x2} {y2}"),
            None => " ".to_string(),
        };
        let (h, w, l) = self.half_extent;
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {} {} {}",
            self.class,
            self.truncated,
            self.occluded,
            self.alpha,
            bbox,
            2.0 * h,
            2.0 * w,
            2.0 * l,
            self.location[0],
            self.location[1],
            self.location[2],
            self.rotation_y
        )
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let record = DetectionRecord::new(ObjectClass::Car, Vec3::new(2.3, 1.0, 0.75));
        assert_eq!(record.truncation(), 0.0);
        assert_eq!(record.occlusion(), 0);
        assert_eq!(record.bbox(), None);
    }

    #[test]
    fn test_setter_domains() {
        let mut record = DetectionRecord::new(ObjectClass::Car, Vec3::new(2.0, 1.0, 0.8));
        assert!(record.set_truncation(1.1).is_err());
        assert!(record.set_truncation(1.0).is_ok());
        assert!(record.set_occlusion(4).is_err());
        assert!(record.set_occlusion(3).is_ok());
        assert!(record.set_alpha(-3.2).is_err());
        assert!(record.set_alpha(0.5).is_ok());
        assert!(record.set_rotation_y(3.5).is_err());
        assert!(record.set_rotation_y(-PI).is_ok());
    }

    #[test]
    fn test_location_permutation() {
        let mut record = DetectionRecord::new(ObjectClass::Car, Vec3::new(2.0, 1.0, 0.8));
        record.set_location([12.0, -3.0, 0.5]);
        assert_eq!(record.location(), [-3.0, -0.5, 12.0]);
    }

    #[test]
    fn test_pedestrian_location_drops_half_height() {
        let mut record = DetectionRecord::new(ObjectClass::Pedestrian, Vec3::new(0.4, 0.4, 0.9));
        record.set_location([8.0, 1.0, 1.2]);
        // half height 0.9 comes off z before the permutation.
        let expected_z = 1.2 - 0.9;
        assert_eq!(record.location(), [1.0, -expected_z, 8.0]);
    }

    #[test]
    fn test_display_without_bbox_renders_a_space() {
        let mut record = DetectionRecord::new(ObjectClass::Car, Vec3::new(2.0, 1.0, 0.8));
        record.set_location([10.0, 0.0, 0.0]);
        let line = record.to_string();
        assert_eq!(
            line,
            "Car 0 0 -10   1.6 4 2 0 -0 10 0",
            "bbox placeholder collapses to a lone space"
        );
    }

    #[test]
    fn test_display_with_bbox() {
        let mut record = DetectionRecord::new(ObjectClass::Pedestrian, Vec3::new(0.5, 0.25, 1.0));
        record.set_bbox([700, 400, 760, 520]);
        record.set_truncation(0.25).unwrap();
        record.set_occlusion(1).unwrap();
        record.set_location([8.0, 1.5, 1.25]);
        record.set_rotation_y(1.5).unwrap();
        let line = record.to_string();
        assert_eq!(
            line,
            "Pedestrian 0.25 1 -10 700 400 760 520 2 1 0.5 1.5 -0.25 8 1.5"
        );
    }
}
