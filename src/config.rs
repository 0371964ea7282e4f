use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Window sizes for page classification and section segmentation.
///
/// These were tuned against OH-1 reports and should be re-derived when a new
/// batch of documents segments badly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Leading lines of a page inspected by the classifier.
    pub classify_window: usize,
    /// Lines skipped after a vehicle start before scanning resumes.
    pub vehicle_skip: usize,
    /// How far back from the ownership line a "UNIT #" heading may sit.
    pub vehicle_lead: usize,
    pub vehicle_max_span: usize,
    pub person_skip: usize,
    pub person_lead: usize,
    pub person_max_span: usize,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            classify_window: 20,
            vehicle_skip: 40,
            vehicle_lead: 6,
            vehicle_max_span: 400,
            person_skip: 2,
            person_lead: 16,
            person_max_span: 120,
        }
    }
}

/// Values stamped on every record when the document does not carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Jurisdiction {
    pub state_code: String,
    pub state_abbreviation: String,
    pub state_name: String,
    pub department: String,
}

impl Default for Jurisdiction {
    fn default() -> Self {
        Self {
            state_code: String::new(),
            state_abbreviation: "OH".to_string(),
            state_name: "OHIO".to_string(),
            department: "Ohio State Highway Patrol".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub calibration: Calibration,
    pub jurisdiction: Jurisdiction,
}

impl EngineConfig {
    /// Load from a JSON file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config JSON in {}", path.display()))
    }
}
