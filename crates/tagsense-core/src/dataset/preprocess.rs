//! Dataset preprocessing: verify, split, rotate, resize, convert.
//!
//! Runs in two passes over the source items. The first verifies every image
//! and drops the ones that fail; the second writes the augmented copies into
//! fresh `train/` and `validation/` directories. The input directory is never
//! modified.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use image::{DynamicImage, Rgb};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::{LimitsConfig, PreprocessConfig};
use crate::error::{DatasetError, ImageError};
use crate::normalize::{resize_to_width, ImageDecoder};

use super::metadata::{write_metadata, MetadataEntry, METADATA_FILE};
use super::{load_items, DatasetItem, TAGS_FILE, TRAIN_SPLIT, VALIDATION_SPLIT};

/// What a preprocessing run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreprocessReport {
    /// Metadata entries found in the input
    pub sources: usize,
    /// Entries dropped because the image failed verification or processing
    pub skipped: usize,
    /// Images written to `train/`
    pub train_images: usize,
    /// Images written to `validation/`
    pub validation_images: usize,
    pub tags_copied: bool,
}

/// Turns a raw dataset directory into a training-ready one.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
    decoder: ImageDecoder,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig, limits: LimitsConfig) -> Self {
        Self {
            config,
            decoder: ImageDecoder::new(limits),
        }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Preprocess `input` into `output`.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<PreprocessReport, DatasetError> {
        let items = load_items(input)?;
        let mut report = PreprocessReport {
            sources: items.len(),
            ..Default::default()
        };
        let workers = self.config.effective_workers();

        tracing::info!(
            "Preprocessing {} images from {:?} (width {}, angles {:?}, validation ratio {})",
            items.len(),
            input,
            self.config.target_width,
            self.config.rotation_angles(),
            self.config.validation_ratio
        );

        // Pass 1: verify.
        let verified: Vec<Option<DatasetItem>> = stream::iter(items)
            .map(|item| {
                let decoder = self.decoder.clone();
                async move {
                    let path = item.path.clone();
                    let result =
                        tokio::task::spawn_blocking(move || verify_file(&decoder, &path)).await;
                    match result {
                        Ok(Ok(())) => Some(item),
                        Ok(Err(e)) => {
                            tracing::warn!("Skipping {:?}: {}", item.path, e);
                            None
                        }
                        Err(e) => {
                            tracing::warn!("Skipping {:?}: verification task failed: {}", item.path, e);
                            None
                        }
                    }
                }
            })
            .buffered(workers)
            .collect()
            .await;

        let valid: Vec<DatasetItem> = verified.into_iter().flatten().collect();
        report.skipped = report.sources - valid.len();

        // Split by source image so rotated copies never cross splits.
        let (train, validation) = self.split(valid);

        let train_dir = output.join(TRAIN_SPLIT);
        let validation_dir = output.join(VALIDATION_SPLIT);
        for dir in [&train_dir, &validation_dir] {
            std::fs::create_dir_all(dir).map_err(|e| DatasetError::io(dir, e))?;
        }

        // Pass 2: augment and write.
        let (train_entries, train_failed) = self.write_split(train, &train_dir, workers).await;
        let (validation_entries, validation_failed) =
            self.write_split(validation, &validation_dir, workers).await;
        report.skipped += train_failed + validation_failed;

        write_metadata(&train_dir.join(METADATA_FILE), &train_entries)?;
        write_metadata(&validation_dir.join(METADATA_FILE), &validation_entries)?;
        report.train_images = train_entries.len();
        report.validation_images = validation_entries.len();

        let tags = input.join(TAGS_FILE);
        if tags.is_file() {
            let target = output.join(TAGS_FILE);
            std::fs::copy(&tags, &target).map_err(|e| DatasetError::io(&target, e))?;
            report.tags_copied = true;
        }

        tracing::info!(
            "Wrote {} train and {} validation images to {:?} ({} skipped)",
            report.train_images,
            report.validation_images,
            output,
            report.skipped
        );
        Ok(report)
    }

    /// Seeded shuffle, then `ceil(n * ratio)` items to validation.
    ///
    /// Each side keeps the original input order.
    fn split(&self, items: Vec<DatasetItem>) -> (Vec<DatasetItem>, Vec<DatasetItem>) {
        let n = items.len();
        let validation_count = ((n as f64) * self.config.validation_ratio).ceil() as usize;
        let validation_count = validation_count.min(n);

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        order.shuffle(&mut rng);

        let mut is_validation = vec![false; n];
        for &i in &order[..validation_count] {
            is_validation[i] = true;
        }

        let (validation, train): (Vec<_>, Vec<_>) = items
            .into_iter()
            .enumerate()
            .partition(|(i, _)| is_validation[*i]);
        (
            train.into_iter().map(|(_, item)| item).collect(),
            validation.into_iter().map(|(_, item)| item).collect(),
        )
    }

    /// Write every angle of every item; returns the entries and the number of
    /// items that produced nothing.
    async fn write_split(
        &self,
        items: Vec<DatasetItem>,
        dir: &Path,
        workers: usize,
    ) -> (Vec<MetadataEntry>, usize) {
        let angles = self.config.rotation_angles();
        let width = self.config.target_width;
        let names = output_names(&items, &angles);

        let results: Vec<Vec<MetadataEntry>> = stream::iter(items.into_iter().zip(names))
            .map(|(item, base)| {
                let decoder = self.decoder.clone();
                let angles = angles.clone();
                let dir = dir.to_path_buf();
                async move {
                    let source = item.path.clone();
                    tokio::task::spawn_blocking(move || {
                        augment_item(&decoder, &item, &base, &dir, &angles, width)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!("Skipping {:?}: processing task failed: {}", source, e);
                        Vec::new()
                    })
                }
            })
            .buffered(workers)
            .collect()
            .await;

        let failed = results.iter().filter(|entries| entries.is_empty()).count();
        (results.into_iter().flatten().collect(), failed)
    }
}

fn read_file(decoder: &ImageDecoder, path: &Path) -> Result<Vec<u8>, ImageError> {
    let reference = path.to_string_lossy();
    let metadata = std::fs::metadata(path).map_err(|_| ImageError::NotFound {
        reference: reference.to_string(),
    })?;
    decoder.validator().check_size(metadata.len(), &reference)?;
    std::fs::read(path).map_err(|e| ImageError::Read {
        reference: reference.to_string(),
        message: e.to_string(),
    })
}

fn verify_file(decoder: &ImageDecoder, path: &Path) -> Result<(), ImageError> {
    let bytes = read_file(decoder, path)?;
    decoder.verify(&bytes, &path.to_string_lossy())?;
    Ok(())
}

/// Output base name for every item of one split.
///
/// Items pooled from several input splits can share a `file_name`. The first
/// keeps it; later ones get their source split as a prefix (plus a counter if
/// that is taken too), so no written file overwrites another. Names are
/// compared case-insensitively, as the output may live on such a filesystem.
fn output_names(items: &[DatasetItem], angles: &[u32]) -> Vec<String> {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(items.len());

    for item in items {
        let original = item.entry.file_name.as_str();
        let mut attempt = 0usize;
        let base = loop {
            let candidate = match attempt {
                0 => original.to_string(),
                1 => prefixed_name(original, &item.split),
                n => prefixed_name(original, &format!("{}{}", item.split, n)),
            };
            let outputs: Vec<String> = angles
                .iter()
                .map(|&a| augmented_name(&candidate, a).to_lowercase())
                .collect();
            if outputs.iter().all(|o| !claimed.contains(o)) {
                claimed.extend(outputs);
                break candidate;
            }
            attempt += 1;
        };

        if base != original {
            tracing::warn!(
                "{} in split {:?} clashes with another image; writing it as {}",
                original,
                item.split,
                base
            );
        }
        names.push(base);
    }
    names
}

/// `sub/cat.png` with prefix `validation` becomes `sub/validation_cat.png`.
fn prefixed_name(file_name: &str, prefix: &str) -> String {
    let path = Path::new(file_name);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{prefix}_{name}");
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.join(name).to_string_lossy().into_owned(),
        None => name,
    }
}

/// Decode one source image and write one output per angle, named after `base`.
fn augment_item(
    decoder: &ImageDecoder,
    item: &DatasetItem,
    base: &str,
    dir: &Path,
    angles: &[u32],
    width: u32,
) -> Vec<MetadataEntry> {
    let reference = item.path.to_string_lossy().into_owned();
    let image = match read_file(decoder, &item.path)
        .and_then(|b| decoder.decode(&b, &reference))
        .and_then(|image| {
            decoder.scaled_dimensions(image.width(), image.height(), width, &reference)?;
            Ok(image)
        }) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
            tracing::warn!("Skipping {}: {}", reference, e);
            return Vec::new();
        }
    };

    let mut entries = Vec::with_capacity(angles.len());
    for &angle in angles {
        let file_name = augmented_name(base, angle);
        let target = dir.join(&file_name);

        let rotated = if angle == 0 {
            image.clone()
        } else {
            // Negative theta turns counter-clockwise.
            rotate_about_center(
                &image,
                -(angle as f32).to_radians(),
                Interpolation::Nearest,
                Rgb([0, 0, 0]),
            )
        };
        let resized = resize_to_width(&DynamicImage::ImageRgb8(rotated), width);

        if let Some(parent) = target.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Cannot create {:?}: {}", parent, e);
                continue;
            }
        }
        match resized.save(&target) {
            Ok(()) => entries.push(item.entry.renamed(file_name)),
            Err(e) => tracing::warn!("Failed to write {:?}: {}", target, e),
        }
    }

    tracing::trace!("{} -> {} images", reference, entries.len());
    entries
}

/// `a/b.jpg` at 90° becomes `a/b_rot90.jpg`; angle 0 keeps the name.
fn augmented_name(file_name: &str, angle: u32) -> String {
    if angle == 0 {
        return file_name.to_string();
    }
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_rot{angle}.{}", ext.to_string_lossy()),
        None => format!("{stem}_rot{angle}"),
    };
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => PathBuf::from(parent).join(name).to_string_lossy().into_owned(),
        None => name,
    }
}
