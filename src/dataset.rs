use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annotation::store::{AnnotationSet, ANNOTATIONS_FILENAME};
use crate::annotation::{FieldKey, NONE_LABEL};
use crate::error::{Error, Result};
use crate::models::FractionalRoi;
use crate::roi::RoiTable;

/// Highest accepted revision number; lineages are materialized in full
pub const MAX_VERSION: u32 = 10_000;

/// Dataset or model revision tag `v<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetVersion(pub u32);

impl DatasetVersion {
    /// This version and every earlier one, newest first
    pub fn lineage(&self) -> Vec<DatasetVersion> {
        (0..=self.0).rev().map(DatasetVersion).collect()
    }
}

impl FromStr for DatasetVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;
        digits
            .parse()
            .ok()
            .filter(|&n| n <= MAX_VERSION)
            .map(DatasetVersion)
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Resolve a version tag to the chain of tags whose samples are pooled for
/// training, e.g. `"v2"` -> `["v2", "v1", "v0"]`
pub fn resolve_versions(tag: &str) -> Result<Vec<String>> {
    let version: DatasetVersion = tag.parse()?;
    Ok(version.lineage().iter().map(ToString::to_string).collect())
}

/// One labeled image for a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingSample {
    pub path: PathBuf,
    pub label_index: usize,
}

/// Labeled samples for one field pooled across a version lineage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrainingPool {
    /// Labels in first-seen order; a sample's `label_index` points here
    pub class_labels: Vec<String>,
    pub samples: Vec<TrainingSample>,
}

impl TrainingPool {
    /// Pool samples of `key` from `<dataset_dir>/<v>/` for every version in
    /// the lineage of `version`.
    ///
    /// Annotation files are ground truth here, so a missing or malformed
    /// one fails the whole gather. Records whose image is gone are skipped.
    /// Records that hide `key` contribute the label "None".
    pub fn gather(dataset_dir: &Path, version: DatasetVersion, key: FieldKey) -> Result<Self> {
        let mut pool = TrainingPool::default();

        for v in version.lineage() {
            let image_dir = dataset_dir.join(v.to_string());
            let annotations = AnnotationSet::load_strict(&image_dir.join(ANNOTATIONS_FILENAME))?;
            debug!("{}: {} annotations", image_dir.display(), annotations.len());

            for record in annotations.iter() {
                if record.filename.is_empty() {
                    continue;
                }
                let path = image_dir.join(&record.filename);
                if !path.is_file() {
                    continue;
                }
                let label = record.field(key).unwrap_or(NONE_LABEL);
                let label_index = pool.label_index(label);
                pool.samples.push(TrainingSample { path, label_index });
            }
        }

        info!(
            "pooled {} samples for '{}' across {} versions",
            pool.samples.len(),
            key,
            version.0 + 1
        );
        Ok(pool)
    }

    fn label_index(&mut self, label: &str) -> usize {
        match self.class_labels.iter().position(|l| l == label) {
            Some(i) => i,
            None => {
                self.class_labels.push(label.to_string());
                self.class_labels.len() - 1
            }
        }
    }
}

/// Everything the external trainer needs for one field
#[derive(Debug, Clone, Serialize)]
pub struct FieldManifest {
    pub key_name: String,
    pub roi: FractionalRoi,
    pub image_size: [u32; 2],
    #[serde(flatten)]
    pub pool: TrainingPool,
}

/// Training input for every field of one dataset version
#[derive(Debug, Clone, Serialize)]
pub struct TrainingManifest {
    pub dataset_version: String,
    pub lineage: Vec<String>,
    pub fields: Vec<FieldManifest>,
}

impl TrainingManifest {
    /// Pool every field. Fields without an ROI definition train on the
    /// full frame.
    pub fn build(
        dataset_dir: &Path,
        version: DatasetVersion,
        rois: &RoiTable,
        image_size: (u32, u32),
    ) -> Result<Self> {
        let mut fields = Vec::new();
        for key in FieldKey::ALL {
            let roi = rois.get(key.as_str()).unwrap_or_else(|| {
                warn!("no ROI defined for '{}', using the full frame", key);
                FractionalRoi::FULL_FRAME
            });
            fields.push(FieldManifest {
                key_name: key.to_string(),
                roi,
                image_size: [image_size.0, image_size.1],
                pool: TrainingPool::gather(dataset_dir, version, key)?,
            });
        }

        Ok(Self {
            dataset_version: version.to_string(),
            lineage: version.lineage().iter().map(ToString::to_string).collect(),
            fields,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_descending_lineage() {
        assert_eq!(resolve_versions("v3").unwrap(), vec!["v3", "v2", "v1", "v0"]);
        assert_eq!(resolve_versions("v0").unwrap(), vec!["v0"]);
    }

    #[test]
    fn rejects_malformed_tags() {
        for tag in ["vX", "v", "3", "v-1", "v+2", "v3abc", "V3", ""] {
            assert!(
                matches!(resolve_versions(tag), Err(Error::InvalidVersion(_))),
                "{} should be rejected",
                tag
            );
        }
    }

    #[test]
    fn rejects_versions_above_limit() {
        assert!(matches!(resolve_versions("v4000000000"), Err(Error::InvalidVersion(_))));
        assert!(matches!(resolve_versions("v10001"), Err(Error::InvalidVersion(_))));
        assert_eq!(resolve_versions("v10000").unwrap().len(), 10_001);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let v: DatasetVersion = "v12".parse().unwrap();
        assert_eq!(v, DatasetVersion(12));
        assert_eq!(v.to_string(), "v12");
    }
}
