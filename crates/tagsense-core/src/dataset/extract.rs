//! Dump a dataset's images as numbered PNGs for inspection.

use std::path::Path;

use serde::Serialize;

use crate::error::DatasetError;

use super::load_items;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractReport {
    pub written: usize,
    pub skipped: usize,
}

/// Write every image of every split as `{output}/{split}_{i}.png`.
///
/// `i` counts entries within a split in metadata order; unreadable images are
/// skipped but still consume their index.
pub fn extract(data_dir: &Path, output: &Path) -> Result<ExtractReport, DatasetError> {
    let items = load_items(data_dir)?;
    std::fs::create_dir_all(output).map_err(|e| DatasetError::io(output, e))?;

    let mut report = ExtractReport::default();
    let mut current_split = String::new();
    let mut index = 0usize;

    for item in items {
        if item.split != current_split {
            current_split = item.split.clone();
            index = 0;
        }
        let target = output.join(format!("{}_{}.png", item.split, index));
        index += 1;

        let result = image::open(&item.path).and_then(|img| img.save(&target));
        match result {
            Ok(()) => report.written += 1,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", item.path, e);
                report.skipped += 1;
            }
        }
    }

    tracing::info!("Extracted {} images to {:?}", report.written, output);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::METADATA_FILE;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::fs;

    #[test]
    fn test_extract_numbers_per_split() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for (split, names) in [("train", vec!["a.jpg", "b.jpg"]), ("validation", vec!["c.jpg"])] {
            let dir = data.path().join(split);
            fs::create_dir_all(&dir).unwrap();
            let mut lines = String::new();
            for name in names {
                RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]))
                    .save_with_format(dir.join(name), ImageFormat::Jpeg)
                    .unwrap();
                lines.push_str(&format!("{{\"file_name\": \"{name}\"}}\n"));
            }
            fs::write(dir.join(METADATA_FILE), lines).unwrap();
        }

        let report = extract(data.path(), out.path()).unwrap();
        assert_eq!(report.written, 3);
        for name in ["train_0.png", "train_1.png", "validation_0.png"] {
            let img = image::open(out.path().join(name)).unwrap();
            assert_eq!(img.width(), 4);
        }
    }
}
