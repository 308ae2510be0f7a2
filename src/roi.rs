use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::FractionalRoi;

/// One named box drawn in the ROI annotator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiDefinition {
    pub name: String,
    pub rect: FractionalRoi,
    /// Expected text formats, only meaningful to OCR consumers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Vec<String>>,
}

/// ROI lookup by field name, merged from one or more definition files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoiTable {
    rois: HashMap<String, FractionalRoi>,
}

impl RoiTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single definition file
    pub fn read_definitions(path: &Path) -> Result<Vec<RoiDefinition>> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            Error::InvalidRoi(format!("{}: {}", path.display(), e))
        })
    }

    /// Load and merge files in order; later files win on name collisions
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut table = Self::new();
        for path in paths {
            table.merge(Self::read_definitions(path.as_ref())?);
        }
        Ok(table)
    }

    pub fn merge(&mut self, definitions: impl IntoIterator<Item = RoiDefinition>) {
        for def in definitions {
            self.rois.insert(def.name, def.rect);
        }
    }

    pub fn get(&self, name: &str) -> Option<FractionalRoi> {
        self.rois.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }
}
