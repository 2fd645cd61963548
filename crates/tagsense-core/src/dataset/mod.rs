//! Image datasets on disk: discovery, preprocessing and extraction.
//!
//! A dataset directory holds an optional `tags.json` and one directory per
//! split, each with images and a `metadata.jsonl`:
//!
//! ```text
//! data/
//! ├── tags.json
//! ├── train/
//! │   ├── metadata.jsonl
//! │   └── *.jpg
//! └── validation/
//!     ├── metadata.jsonl
//!     └── *.jpg
//! ```
//!
//! A `metadata.jsonl` at the top level is read as the `train` split.

pub mod extract;
pub mod metadata;
pub mod preprocess;

pub use extract::{extract, ExtractReport};
pub use metadata::{read_metadata, write_metadata, MetadataEntry, METADATA_FILE};
pub use preprocess::{PreprocessReport, Preprocessor};

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DatasetError;

pub const TAGS_FILE: &str = "tags.json";
pub const TRAIN_SPLIT: &str = "train";
pub const VALIDATION_SPLIT: &str = "validation";

/// A split directory and its metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDir {
    pub name: String,
    pub dir: PathBuf,
}

impl SplitDir {
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }
}

/// One metadata entry resolved against its split directory.
#[derive(Debug, Clone)]
pub struct DatasetItem {
    pub split: String,
    /// Image file on disk
    pub path: PathBuf,
    /// The split's `metadata.jsonl`
    pub metadata: PathBuf,
    /// Line in `metadata`
    pub line: usize,
    pub entry: MetadataEntry,
}

/// Find every split under `root`, top-level first, then by name.
pub fn discover_splits(root: &Path) -> Result<Vec<SplitDir>, DatasetError> {
    if !root.is_dir() {
        return Err(DatasetError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "dataset directory not found"),
        ));
    }

    let mut found: Vec<(usize, SplitDir)> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == METADATA_FILE)
        .filter_map(|e| {
            let dir = e.path().parent()?.to_path_buf();
            let name = if e.depth() == 1 {
                TRAIN_SPLIT.to_string()
            } else {
                dir.file_name()?.to_string_lossy().into_owned()
            };
            Some((e.depth(), SplitDir { name, dir }))
        })
        .collect();

    // Stable: split directories stay in name order after the top level.
    found.sort_by_key(|(depth, _)| *depth);
    let splits: Vec<SplitDir> = found.into_iter().map(|(_, split)| split).collect();

    if splits.is_empty() {
        return Err(DatasetError::MissingMetadata(root.to_path_buf()));
    }
    Ok(splits)
}

/// Every item of every split, in split then line order.
pub fn load_items(root: &Path) -> Result<Vec<DatasetItem>, DatasetError> {
    let mut items = Vec::new();
    for split in discover_splits(root)? {
        let metadata = split.metadata_path();
        for (line, entry) in read_metadata(&metadata)? {
            items.push(DatasetItem {
                split: split.name.clone(),
                path: split.dir.join(&entry.file_name),
                metadata: metadata.clone(),
                line,
                entry,
            });
        }
    }
    tracing::debug!("Loaded {} dataset items from {:?}", items.len(), root);
    Ok(items)
}
