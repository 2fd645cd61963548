//! `metadata.jsonl`: one JSON object per image, keyed by `file_name`.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DatasetError;

pub const METADATA_FILE: &str = "metadata.jsonl";

/// One metadata line. Fields other than `file_name` are carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub file_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataEntry {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            extra: Map::new(),
        }
    }

    /// The multi-hot `tags` vector, if present.
    pub fn tags(&self) -> Option<&Vec<Value>> {
        self.extra.get("tags").and_then(Value::as_array)
    }

    /// Same entry pointing at another file.
    pub fn renamed(&self, file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            extra: self.extra.clone(),
        }
    }
}

/// Read every non-blank line of a metadata file, paired with its line number.
pub fn read_metadata(path: &Path) -> Result<Vec<(usize, MetadataEntry)>, DatasetError> {
    let content = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: MetadataEntry =
            serde_json::from_str(line).map_err(|e| DatasetError::Metadata {
                path: path.to_path_buf(),
                line: index + 1,
                message: e.to_string(),
            })?;
        entries.push((index + 1, entry));
    }
    Ok(entries)
}

/// Write entries as JSON lines, replacing any existing file.
pub fn write_metadata(path: &Path, entries: &[MetadataEntry]) -> Result<(), DatasetError> {
    let file = fs::File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        let line = serde_json::to_string(entry).map_err(|e| DatasetError::Metadata {
            path: path.to_path_buf(),
            line: 0,
            message: e.to_string(),
        })?;
        writeln!(writer, "{line}").map_err(|e| DatasetError::io(path, e))?;
    }
    writer.flush().map_err(|e| DatasetError::io(path, e))
}
