//! JSON collection store.
//!
//! Each collection is one pretty-printed JSON array in the dataset
//! directory. Appends are read-modify-write: load the array, push the
//! new records, write the whole file back through a temp-file rename so
//! a crash mid-write can never leave a truncated collection behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// The nine collection files of the relational output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Sensor,
    CalibratedSensor,
    Category,
    EgoPose,
    Scene,
    Sample,
    SampleData,
    SampleAnnotation,
    Instance,
}

impl Collection {
    pub fn filename(&self) -> &'static str {
        match self {
            Collection::Sensor => "sensor.json",
            Collection::CalibratedSensor => "calibrated_sensor.json",
            Collection::Category => "category.json",
            Collection::EgoPose => "ego_pose.json",
            Collection::Scene => "scene.json",
            Collection::Sample => "sample.json",
            Collection::SampleData => "sample_data.json",
            Collection::SampleAnnotation => "sample_annotation.json",
            Collection::Instance => "instance.json",
        }
    }

    /// Collections that grow by appends over the run. The other three
    /// are written whole at startup.
    pub const CHAINED: [Collection; 6] = [
        Collection::EgoPose,
        Collection::Scene,
        Collection::Sample,
        Collection::SampleData,
        Collection::SampleAnnotation,
        Collection::Instance,
    ];
}

/// Handle on the dataset directory holding the collection files.
#[derive(Debug, Clone)]
pub struct JsonLog {
    dir: PathBuf,
}

impl JsonLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonLog { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.filename())
    }

    /// Creates the dataset directory and resets every chained collection
    /// to an empty array. The relational graph always describes a single
    /// run, so this runs unconditionally at startup.
    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        for collection in Collection::CHAINED {
            self.save_atomic(&self.path(collection), "[]")?;
        }
        debug!("Initialized collection store at {}", self.dir.display());
        Ok(())
    }

    /// Replaces a collection with the given records.
    pub fn write_collection<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)?;
        self.save_atomic(&self.path(collection), &json)?;
        debug!(
            "Wrote {} with {} records",
            collection.filename(),
            records.len()
        );
        Ok(())
    }

    /// Appends records to a chained collection.
    pub fn extend<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut values: Vec<serde_json::Value> = self.read(collection)?;
        values.reserve(records.len());
        for record in records {
            values.push(serde_json::to_value(record)?);
        }
        let json = serde_json::to_string_pretty(&values)?;
        self.save_atomic(&self.path(collection), &json)?;
        debug!(
            "Extended {} by {} to {} records",
            collection.filename(),
            records.len(),
            values.len()
        );
        Ok(())
    }

    /// Appends a single record to a chained collection.
    pub fn append<T: Serialize>(&self, collection: Collection, record: &T) -> Result<(), StoreError> {
        self.extend(collection, std::slice::from_ref(record))
    }

    /// Reads a whole collection back. Fails with
    /// [`StoreError::MissingCollection`] when the file was never
    /// initialized.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        let path = self.path(collection);
        if !path.exists() {
            return Err(StoreError::MissingCollection {
                path: path.display().to_string(),
            });
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save_atomic(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(contents.as_bytes())?;
            file.flush()?;
            // sync_all ensures data is written to disk (portable fsync)
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        token: String,
        value: u32,
    }

    fn row(token: &str, value: u32) -> Row {
        Row {
            token: token.to_string(),
            value,
        }
    }

    #[test]
    fn test_initialize_creates_empty_chained_collections() {
        let dir = TempDir::new().unwrap();
        let log = JsonLog::new(dir.path().join("mini"));
        log.initialize().unwrap();

        for collection in Collection::CHAINED {
            let rows: Vec<Row> = log.read(collection).unwrap();
            assert!(rows.is_empty(), "{} starts empty", collection.filename());
        }
        // Whole-file collections are not created until written.
        assert!(!log.path(Collection::Sensor).exists());
    }

    #[test]
    fn test_append_and_extend_round_trip() {
        let dir = TempDir::new().unwrap();
        let log = JsonLog::new(dir.path().join("mini"));
        log.initialize().unwrap();

        log.append(Collection::Sample, &row("a", 1)).unwrap();
        log.extend(Collection::Sample, &[row("b", 2), row("c", 3)])
            .unwrap();

        let rows: Vec<Row> = log.read(Collection::Sample).unwrap();
        assert_eq!(rows, vec![row("a", 1), row("b", 2), row("c", 3)]);
    }

    #[test]
    fn test_extend_empty_batch_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let log = JsonLog::new(dir.path().join("mini"));
        log.initialize().unwrap();
        let before = fs::read_to_string(log.path(Collection::Scene)).unwrap();
        log.extend::<Row>(Collection::Scene, &[]).unwrap();
        let after = fs::read_to_string(log.path(Collection::Scene)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_extend_uninitialized_collection_fails() {
        let dir = TempDir::new().unwrap();
        let log = JsonLog::new(dir.path().join("mini"));
        let err = log.extend(Collection::Sample, &[row("a", 1)]).unwrap_err();
        assert!(matches!(err, StoreError::MissingCollection { .. }));
    }

    #[test]
    fn test_write_collection_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let log = JsonLog::new(dir.path().join("mini"));
        log.write_collection(Collection::Sensor, &[row("s1", 0)]).unwrap();
        log.write_collection(Collection::Sensor, &[row("s2", 0), row("s3", 0)])
            .unwrap();
        let rows: Vec<Row> = log.read(Collection::Sensor).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].token, "s2");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let log = JsonLog::new(dir.path().join("mini"));
        log.initialize().unwrap();
        log.append(Collection::EgoPose, &row("e", 9)).unwrap();

        let leftovers: Vec<_> = fs::read_dir(log.dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().map(|e| e == "tmp").unwrap_or(false)
            })
            .collect();
        assert!(leftovers.is_empty(), "temp files should be renamed away");
    }

    #[test]
    fn test_pretty_printed_output() {
        let dir = TempDir::new().unwrap();
        let log = JsonLog::new(dir.path().join("mini"));
        log.initialize().unwrap();
        log.append(Collection::Instance, &row("i", 4)).unwrap();
        let text = fs::read_to_string(log.path(Collection::Instance)).unwrap();
        assert!(text.contains("\n  {"), "arrays are indented: {text}");
    }
}
