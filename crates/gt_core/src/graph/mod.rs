//! Relational dataset graph.
//!
//! The output format is a set of JSON collections whose records point
//! at each other through string tokens: scenes own sample chains,
//! samples anchor per-sensor data records and per-instance annotation
//! chains, and a handful of startup collections (sensors, calibrations,
//! categories) are referenced throughout.
//!
//! [`token`] defines the link primitive, [`records`] the serialized
//! record shapes, and [`builder`] the stateful writer that keeps every
//! chain consistent.

pub mod builder;
pub mod records;
pub mod token;

pub use builder::TokenGraphBuilder;
pub use records::{
    CalibratedSensorRecord, CategoryRecord, EgoPoseRecord, InstanceRecord, SampleAnnotationRecord,
    SampleDataRecord, SampleRecord, SceneRecord, SensorRecord,
};
pub use token::Token;
