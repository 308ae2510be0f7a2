use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::warn;

use crate::annotation::AnnotationRecord;
use crate::error::{Error, Result};

/// Name of the annotation file inside every dataset version directory
pub const ANNOTATIONS_FILENAME: &str = "annotations.json";

/// All annotation records of one dataset directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    records: Vec<AnnotationRecord>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<AnnotationRecord>) -> Self {
        Self { records }
    }

    /// Load annotations that must be trustworthy, e.g. training ground
    /// truth. A missing file is an I/O error, a corrupt one is
    /// [`Error::MalformedAnnotationFile`].
    pub fn load_strict(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let records = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            Error::MalformedAnnotationFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self { records })
    }

    /// Load annotations for display or incremental editing. A missing or
    /// unreadable file yields an empty set.
    pub fn load_lenient(path: &Path) -> Self {
        if !path.is_file() {
            return Self::new();
        }
        match Self::load_strict(path) {
            Ok(set) => set,
            Err(e) => {
                warn!("ignoring annotations in {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn get(&self, filename: &str) -> Option<&AnnotationRecord> {
        self.records.iter().find(|r| r.filename == filename)
    }

    /// Replace the record for this filename wholesale: the old record is
    /// removed and the new one appended
    pub fn upsert(&mut self, record: AnnotationRecord) {
        if let Some(pos) = self.records.iter().position(|r| r.filename == record.filename) {
            self.records.remove(pos);
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<AnnotationRecord> {
        self.records
    }

    /// Write the whole set as a pretty JSON array, replacing `path`
    /// atomically via a sibling temp file
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &self.records)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
